//! WhatsApp Cloud API channel: parse webhook deliveries and send text replies via the Graph API.

use crate::channels::handle::ChannelHandle;
use crate::channels::inbound::{InboundEvent, NoEventReason, WebhookEvent};
use crate::config::WhatsAppConfig;
use crate::http;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

// Every level is optional so that status updates, read receipts and junk bodies
// deserialize (or fail) into "no event" instead of an error.

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    entry: Option<Vec<WebhookEntry>>,
}

#[derive(Debug, Deserialize)]
struct WebhookEntry {
    #[serde(default)]
    changes: Option<Vec<WebhookChange>>,
}

#[derive(Debug, Deserialize)]
struct WebhookChange {
    #[serde(default)]
    value: Option<WebhookValue>,
}

#[derive(Debug, Deserialize)]
struct WebhookValue {
    #[serde(default)]
    messages: Option<Vec<WebhookMessage>>,
}

#[derive(Debug, Deserialize)]
struct WebhookMessage {
    /// Sender's WhatsApp id (phone number).
    #[serde(default)]
    from: Option<String>,
    #[serde(default, rename = "type")]
    message_type: Option<String>,
    #[serde(default)]
    text: Option<WebhookText>,
    /// Button or list selection.
    #[serde(default)]
    interactive: Option<WebhookInteractive>,
}

#[derive(Debug, Deserialize)]
struct WebhookText {
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WebhookInteractive {
    #[serde(default)]
    button_reply: Option<WebhookReplyTitle>,
    #[serde(default)]
    list_reply: Option<WebhookReplyTitle>,
}

#[derive(Debug, Deserialize)]
struct WebhookReplyTitle {
    #[serde(default)]
    title: Option<String>,
}

impl WebhookMessage {
    /// Typed text, or the title of the selected button / list row.
    fn text(&self) -> String {
        if let Some(body) = self.text.as_ref().and_then(|t| t.body.as_ref()) {
            return body.clone();
        }
        self.interactive
            .as_ref()
            .and_then(|i| i.button_reply.as_ref().or(i.list_reply.as_ref()))
            .and_then(|r| r.title.clone())
            .unwrap_or_default()
    }
}

/// Extract the first message event (`entry[0].changes[0].value.messages[0]`) from a webhook body.
///
/// Never fails: bodies that are not JSON, have the wrong shape, or carry no message all
/// come back as [`WebhookEvent::NoEvent`].
pub fn extract_event(body: &[u8]) -> WebhookEvent {
    let payload: WebhookPayload = match serde_json::from_slice(body) {
        Ok(p) => p,
        Err(e) => {
            log::debug!("whatsapp webhook: unparseable payload: {}", e);
            return WebhookEvent::NoEvent(NoEventReason::NoEntry);
        }
    };
    let Some(entry) = payload.entry.and_then(|e| e.into_iter().next()) else {
        return WebhookEvent::NoEvent(NoEventReason::NoEntry);
    };
    let message = entry
        .changes
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.value)
        .and_then(|v| v.messages)
        .and_then(|m| m.into_iter().next());
    let Some(message) = message else {
        return WebhookEvent::NoEvent(NoEventReason::NoMessages);
    };
    let sender_id = message
        .from
        .as_deref()
        .map(str::trim)
        .unwrap_or("")
        .to_string();
    if sender_id.is_empty() {
        return WebhookEvent::NoEvent(NoEventReason::NoMessages);
    }
    WebhookEvent::Message(InboundEvent {
        text: message.text(),
        message_type: message.message_type.clone().unwrap_or_default(),
        sender_id,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum WhatsAppError {
    #[error("whatsapp {0} not configured")]
    NotConfigured(&'static str),
    #[error("whatsapp request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("whatsapp api error: {0}")]
    Api(String),
}

/// Client for the Graph API send-message endpoint.
#[derive(Clone)]
pub struct WhatsAppClient {
    id: String,
    /// `{api_base}/{api_version}/{phone_number_id}/messages`; None when no phone number id is set.
    messages_url: Option<String>,
    access_token: Option<String>,
    client: reqwest::Client,
}

impl WhatsAppClient {
    pub fn new(config: &WhatsAppConfig, timeout: Duration) -> Self {
        let base = config.api_base.trim().trim_end_matches('/');
        let version = config.api_version.trim().trim_matches('/');
        let messages_url = config
            .phone_number_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                if version.is_empty() {
                    format!("{}/{}/messages", base, id)
                } else {
                    format!("{}/{}/{}/messages", base, version, id)
                }
            });
        Self {
            id: "whatsapp".to_string(),
            messages_url,
            access_token: config
                .access_token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            client: http::client_with_timeout(timeout),
        }
    }

    /// POST a text message to `to`. No retry; non-2xx responses are returned as errors.
    pub async fn send_text(&self, to: &str, text: &str) -> Result<(), WhatsAppError> {
        let url = self
            .messages_url
            .as_ref()
            .ok_or(WhatsAppError::NotConfigured("phone number id"))?;
        let token = self
            .access_token
            .as_ref()
            .ok_or(WhatsAppError::NotConfigured("access token"))?;
        let body = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": to,
            "text": { "body": text }
        });
        let res = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(WhatsAppError::Api(format!("{} {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelHandle for WhatsAppClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send_message(&self, recipient_id: &str, text: &str) -> Result<(), String> {
        self.send_text(recipient_id, text)
            .await
            .map_err(|e| e.to_string())
    }
}
