//! Gateway: the HTTP surface the messaging platform talks to.
//!
//! One port serves a health probe and the webhook. Every request is handled independently;
//! the only shared state is immutable config and the outbound clients.

mod server;

pub use server::{build_composer, router, run_gateway, GatewayState, VerifyQuery};
