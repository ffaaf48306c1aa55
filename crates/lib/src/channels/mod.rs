//! Messaging channels.
//!
//! The WhatsApp Cloud API channel parses inbound webhook deliveries into [`WebhookEvent`]s
//! and sends text replies through the [`ChannelHandle`] seam.

mod handle;
mod inbound;
mod whatsapp;

pub use handle::ChannelHandle;
pub use inbound::{InboundEvent, NoEventReason, WebhookEvent};
pub use whatsapp::{extract_event, WhatsAppClient, WhatsAppError};
