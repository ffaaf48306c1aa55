//! Outbound seam: anything that can deliver a text reply to a conversation.

use async_trait::async_trait;

/// Handle to a channel that can send replies.
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Channel id (e.g. "whatsapp").
    fn id(&self) -> &str;
    /// Send a text message to a recipient (e.g. a WhatsApp user id).
    async fn send_message(&self, recipient_id: &str, text: &str) -> Result<(), String>;
}
