//! Relay core library: WhatsApp webhook handling, reply composition with a language model
//! and Shopify order lookup, and the HTTP gateway that ties them together.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod http;
pub mod init;
pub mod llm;
pub mod orders;
pub mod reply;
