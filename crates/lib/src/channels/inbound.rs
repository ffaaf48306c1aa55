//! Inbound event from the messaging platform: what the webhook extractor hands to the reply pipeline.

/// One message event: who sent it, what they wrote, and the platform's message type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub sender_id: String,
    /// Message text; empty for media or other non-text messages.
    pub text: String,
    pub message_type: String,
}

/// Why a webhook payload carried no message to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoEventReason {
    /// No `entry` (or the body was not a webhook payload at all).
    NoEntry,
    /// An entry was present but no message (status updates, read receipts, ...).
    NoMessages,
}

impl NoEventReason {
    /// Short status token returned in the webhook acknowledgment.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoEventReason::NoEntry => "no_entry",
            NoEventReason::NoMessages => "no_messages",
        }
    }
}

/// Result of parsing one webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    Message(InboundEvent),
    NoEvent(NoEventReason),
}
