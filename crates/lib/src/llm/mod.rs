//! Language-model responder: one system persona plus the user's text in, one reply out.
//!
//! [`Responder`] is the seam the reply pipeline depends on; [`OpenAiClient`] implements it
//! against any OpenAI-compatible chat-completions endpoint.

mod openai;

pub use openai::{ChatMessage, OpenAiClient};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("llm api key not configured")]
    NotConfigured,
    #[error("llm request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("llm api error: {0}")]
    Api(String),
}

/// Generates a reply for a single user turn.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, persona: &str, user_text: &str) -> Result<String, LlmError>;
}
