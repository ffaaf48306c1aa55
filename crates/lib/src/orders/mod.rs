//! Order lookup: resolve an order number from chat text into the facts a customer asks about.
//!
//! [`OrderResolver`] is the seam the reply pipeline depends on; [`ShopifyClient`] implements it
//! against the Shopify Admin REST API. Summaries are fetched per request and never cached.

mod shopify;

pub use shopify::ShopifyClient;

use async_trait::async_trait;

/// The subset of an order that goes into a status reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderSummary {
    /// Store-facing order name, e.g. "#1001".
    pub display_name: String,
    pub fulfillment_status: Option<String>,
    pub tracking_number: Option<String>,
    pub shipping_carrier: Option<String>,
    pub expected_delivery: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ShopifyError {
    #[error("shopify store not configured")]
    NotConfigured,
    #[error("shopify request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("shopify api error: {0}")]
    Api(String),
}

/// Looks up a single order by its number.
#[async_trait]
pub trait OrderResolver: Send + Sync {
    /// `Ok(None)` when the store has no matching order.
    async fn find_order(&self, order_id: &str) -> Result<Option<OrderSummary>, ShopifyError>;
}
