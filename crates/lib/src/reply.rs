//! Reply pipeline: turn one inbound message into one outbound reply text.
//!
//! The language model always produces the base reply. When the text looks like an order-status
//! question and carries an order number, the order lookup result replaces it. Failures of either
//! collaborator degrade to a fixed apology so that every message gets some answer.

use crate::llm::Responder;
use crate::orders::{OrderResolver, OrderSummary};
use regex::Regex;
use std::sync::{Arc, LazyLock};

/// Sent when the order lookup call fails.
pub const ORDER_LOOKUP_FAILED_REPLY: &str =
    "Sorry, I couldn't fetch your order right now. Try again in a bit.";

/// Base reply when the language model call fails or returns nothing.
pub const RESPONDER_FAILED_REPLY: &str =
    "Sorry, I can't reply right now. Please try again in a bit.";

// Order numbers are ASCII digits only.
static ORDER_NUMBER_INTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)order\s*#?[0-9]+").expect("valid order number regex"));
static WHERE_ORDER_INTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)where.*order").expect("valid where-order regex"));
static STATUS_ORDER_INTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)status.*order").expect("valid status-order regex"));
static ORDER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#?([0-9]{3,20})").expect("valid order id regex"));

/// True when any of the order-status patterns matches (case-insensitive).
pub fn detect_order_intent(text: &str) -> bool {
    ORDER_NUMBER_INTENT_RE.is_match(text)
        || WHERE_ORDER_INTENT_RE.is_match(text)
        || STATUS_ORDER_INTENT_RE.is_match(text)
}

/// First run of 3–20 digits (optionally after `#`). Later numbers in the same message are ignored.
pub fn extract_order_id(text: &str) -> Option<&str> {
    ORDER_ID_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Status sentence for a found order. Missing fields get fixed placeholders.
pub fn format_order_summary(order: &OrderSummary) -> String {
    format!(
        "Order {} is currently {}. Tracking: {}. Shipping service: {}. Expected delivery: {}.",
        order.display_name,
        order.fulfillment_status.as_deref().unwrap_or("processing"),
        order.tracking_number.as_deref().unwrap_or("Not available"),
        order.shipping_carrier.as_deref().unwrap_or("N/A"),
        order.expected_delivery.as_deref().unwrap_or("N/A"),
    )
}

/// Clarification request when no order matches the number.
pub fn order_not_found_reply(order_id: &str) -> String {
    format!(
        "I couldn't find order {}. Could you please share the email or phone used for the order?",
        order_id
    )
}

/// Composes replies. Holds only immutable, shared collaborators; one instance serves all requests.
#[derive(Clone)]
pub struct ReplyComposer {
    responder: Arc<dyn Responder>,
    /// None disables order lookup entirely (replies come from the language model only).
    orders: Option<Arc<dyn OrderResolver>>,
    persona: String,
    greeting: String,
}

impl ReplyComposer {
    pub fn new(
        responder: Arc<dyn Responder>,
        orders: Option<Arc<dyn OrderResolver>>,
        persona: String,
        greeting: String,
    ) -> Self {
        Self {
            responder,
            orders,
            persona,
            greeting,
        }
    }

    pub fn order_lookup_enabled(&self) -> bool {
        self.orders.is_some()
    }

    /// Produce the reply for one message. Never fails and never returns an empty string.
    pub async fn compose(&self, sender_id: &str, text: &str) -> String {
        let text = if text.trim().is_empty() {
            self.greeting.as_str()
        } else {
            text
        };

        let base_reply = match self.responder.respond(&self.persona, text).await {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                log::warn!("reply: empty model reply for {}", sender_id);
                RESPONDER_FAILED_REPLY.to_string()
            }
            Err(e) => {
                log::warn!("reply: model call failed for {}: {}", sender_id, e);
                RESPONDER_FAILED_REPLY.to_string()
            }
        };

        let Some(orders) = self.orders.as_ref() else {
            return base_reply;
        };
        if !detect_order_intent(text) {
            return base_reply;
        }
        let Some(order_id) = extract_order_id(text) else {
            log::debug!("reply: order intent without order number from {}", sender_id);
            return base_reply;
        };

        log::info!("reply: looking up order {} for {}", order_id, sender_id);
        match orders.find_order(order_id).await {
            Ok(Some(order)) => format_order_summary(&order),
            Ok(None) => order_not_found_reply(order_id),
            Err(e) => {
                log::error!("reply: order lookup for {} failed: {}", order_id, e);
                ORDER_LOOKUP_FAILED_REPLY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::orders::ShopifyError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeResponder {
        reply: Option<String>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl FakeResponder {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Responder for FakeResponder {
        async fn respond(&self, persona: &str, user_text: &str) -> Result<String, LlmError> {
            self.seen
                .lock()
                .unwrap()
                .push((persona.to_string(), user_text.to_string()));
            self.reply
                .clone()
                .ok_or_else(|| LlmError::Api("500 upstream".to_string()))
        }
    }

    enum Lookup {
        Found(OrderSummary),
        NotFound,
        Fail,
    }

    struct FakeOrders {
        result: Lookup,
        calls: Mutex<Vec<String>>,
    }

    impl FakeOrders {
        fn new(result: Lookup) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl OrderResolver for FakeOrders {
        async fn find_order(&self, order_id: &str) -> Result<Option<OrderSummary>, ShopifyError> {
            self.calls.lock().unwrap().push(order_id.to_string());
            match &self.result {
                Lookup::Found(o) => Ok(Some(o.clone())),
                Lookup::NotFound => Ok(None),
                Lookup::Fail => Err(ShopifyError::Api("503 Service Unavailable".to_string())),
            }
        }
    }

    fn composer(responder: Arc<FakeResponder>, orders: Option<Arc<FakeOrders>>) -> ReplyComposer {
        ReplyComposer::new(
            responder,
            orders.map(|o| o as Arc<dyn OrderResolver>),
            "You are a shop assistant.".to_string(),
            "Hi".to_string(),
        )
    }

    fn order_1001() -> OrderSummary {
        OrderSummary {
            display_name: "#1001".to_string(),
            fulfillment_status: Some("fulfilled".to_string()),
            tracking_number: Some("TRK1".to_string()),
            shipping_carrier: Some("DHL".to_string()),
            expected_delivery: None,
        }
    }

    #[test]
    fn intent_patterns() {
        assert!(detect_order_intent("Where is my order #12345?"));
        assert!(detect_order_intent("ORDER 555"));
        assert!(detect_order_intent("order#42"));
        assert!(detect_order_intent("where's my order"));
        assert!(detect_order_intent("What is the status of my order?"));
        assert!(!detect_order_intent("Do you sell silk sarees?"));
        assert!(!detect_order_intent("I want to place an order"));
        assert!(!detect_order_intent("order status please"));
        assert!(!detect_order_intent("order १२३४५"));
    }

    #[test]
    fn order_id_extraction() {
        assert_eq!(extract_order_id("Where is my order #12345?"), Some("12345"));
        assert_eq!(extract_order_id("order 12 then 3456 and 7890"), Some("3456"));
        assert_eq!(extract_order_id("order 12"), None);
        assert_eq!(
            extract_order_id("order 1234567890123456789012345"),
            Some("12345678901234567890")
        );
        assert_eq!(extract_order_id("where is my order #१२३४५"), None);
        assert_eq!(extract_order_id("order #١٢٣٤ or 4567"), Some("4567"));
    }

    #[test]
    fn summary_sentence_with_defaults() {
        assert_eq!(
            format_order_summary(&order_1001()),
            "Order #1001 is currently fulfilled. Tracking: TRK1. Shipping service: DHL. Expected delivery: N/A."
        );
        let bare = OrderSummary {
            display_name: "#7".to_string(),
            ..OrderSummary::default()
        };
        assert_eq!(
            format_order_summary(&bare),
            "Order #7 is currently processing. Tracking: Not available. Shipping service: N/A. Expected delivery: N/A."
        );
    }

    #[tokio::test]
    async fn non_order_text_returns_model_reply_unmodified() {
        let responder = FakeResponder::ok("We have new arrivals!");
        let orders = FakeOrders::new(Lookup::Fail);
        let c = composer(responder.clone(), Some(orders.clone()));
        assert_eq!(c.compose("1555", "Any new sarees?").await, "We have new arrivals!");
        assert!(orders.calls().is_empty());
        assert_eq!(
            responder.seen.lock().unwrap().clone(),
            vec![(
                "You are a shop assistant.".to_string(),
                "Any new sarees?".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn found_order_overrides_model_reply() {
        let orders = FakeOrders::new(Lookup::Found(order_1001()));
        let c = composer(FakeResponder::ok("model"), Some(orders.clone()));
        assert_eq!(
            c.compose("1555", "Where is my order #1001?").await,
            "Order #1001 is currently fulfilled. Tracking: TRK1. Shipping service: DHL. Expected delivery: N/A."
        );
        assert_eq!(orders.calls(), vec!["1001".to_string()]);
    }

    #[tokio::test]
    async fn missing_order_asks_for_contact_details() {
        let c = composer(
            FakeResponder::ok("model"),
            Some(FakeOrders::new(Lookup::NotFound)),
        );
        let reply = c.compose("1555", "status of order 99999").await;
        assert!(reply.contains("99999"));
        assert!(reply.contains("email or phone"));
    }

    #[tokio::test]
    async fn lookup_failure_becomes_apology() {
        let c = composer(FakeResponder::ok("model"), Some(FakeOrders::new(Lookup::Fail)));
        assert_eq!(
            c.compose("1555", "where is order #12345").await,
            ORDER_LOOKUP_FAILED_REPLY
        );
    }

    #[tokio::test]
    async fn intent_without_number_keeps_model_reply() {
        let orders = FakeOrders::new(Lookup::Fail);
        let c = composer(FakeResponder::ok("Please share your order number."), Some(orders.clone()));
        assert_eq!(
            c.compose("1555", "Where is my order?").await,
            "Please share your order number."
        );
        assert!(orders.calls().is_empty());
    }

    #[tokio::test]
    async fn model_failure_degrades_to_apology() {
        let c = composer(FakeResponder::failing(), Some(FakeOrders::new(Lookup::Fail)));
        assert_eq!(c.compose("1555", "hello").await, RESPONDER_FAILED_REPLY);
    }

    #[tokio::test]
    async fn model_failure_still_answers_order_question() {
        let c = composer(
            FakeResponder::failing(),
            Some(FakeOrders::new(Lookup::Found(order_1001()))),
        );
        assert!(c
            .compose("1555", "order #1001")
            .await
            .starts_with("Order #1001 is currently fulfilled."));
    }

    #[tokio::test]
    async fn empty_model_reply_is_replaced() {
        let c = composer(FakeResponder::ok("   "), None);
        assert_eq!(c.compose("1555", "hello").await, RESPONDER_FAILED_REPLY);
    }

    #[tokio::test]
    async fn empty_text_uses_greeting() {
        let responder = FakeResponder::ok("Hello! How can I help?");
        let c = composer(responder.clone(), None);
        assert_eq!(c.compose("1555", "  ").await, "Hello! How can I help?");
        assert_eq!(responder.seen.lock().unwrap()[0].1, "Hi");
    }

    #[tokio::test]
    async fn non_ascii_digits_keep_model_reply() {
        let orders = FakeOrders::new(Lookup::NotFound);
        let c = composer(FakeResponder::ok("Please share your order number."), Some(orders.clone()));
        assert_eq!(
            c.compose("1555", "where is my order #१२३४५").await,
            "Please share your order number."
        );
        assert!(orders.calls().is_empty());
    }

    #[tokio::test]
    async fn without_order_lookup_model_reply_is_final() {
        let c = composer(FakeResponder::ok("model"), None);
        assert!(!c.order_lookup_enabled());
        assert_eq!(c.compose("1555", "Where is my order #12345?").await, "model");
    }
}
