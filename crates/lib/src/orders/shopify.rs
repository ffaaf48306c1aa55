//! Shopify Admin REST client: GET /admin/api/{version}/orders.json filtered by order name.

use crate::config::ShopifyConfig;
use crate::orders::{OrderResolver, OrderSummary, ShopifyError};
use crate::http;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const ORDER_PAGE_LIMIT: &str = "10";

/// Client for the Shopify Admin API orders endpoint.
#[derive(Clone)]
pub struct ShopifyClient {
    /// `https://{store_domain}` or the configured base URL override.
    base_url: Option<String>,
    access_token: Option<String>,
    api_version: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct OrdersResponse {
    #[serde(default)]
    orders: Option<Vec<ShopifyOrder>>,
}

#[derive(Debug, Deserialize)]
struct ShopifyOrder {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    fulfillment_status: Option<String>,
    #[serde(default)]
    fulfillments: Option<Vec<ShopifyFulfillment>>,
}

#[derive(Debug, Deserialize)]
struct ShopifyFulfillment {
    #[serde(default)]
    tracking_numbers: Option<Vec<String>>,
    #[serde(default)]
    tracking_number: Option<String>,
    #[serde(default)]
    tracking_company: Option<String>,
}

impl ShopifyOrder {
    /// Project onto the reply-facing summary. Only the first fulfillment is considered;
    /// Shopify does not report an expected delivery date on orders.
    fn into_summary(self, order_id: &str) -> OrderSummary {
        let fulfillment = self.fulfillments.and_then(|f| f.into_iter().next());
        let (tracking_number, shipping_carrier) = match fulfillment {
            Some(f) => (
                f.tracking_numbers
                    .and_then(|n| n.into_iter().next())
                    .or(f.tracking_number)
                    .filter(|n| !n.trim().is_empty()),
                f.tracking_company.filter(|c| !c.trim().is_empty()),
            ),
            None => (None, None),
        };
        OrderSummary {
            display_name: self
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| format!("#{}", order_id)),
            fulfillment_status: self.fulfillment_status.filter(|s| !s.trim().is_empty()),
            tracking_number,
            shipping_carrier,
            expected_delivery: None,
        }
    }
}

impl ShopifyClient {
    pub fn new(config: &ShopifyConfig, timeout: Duration) -> Self {
        Self {
            base_url: config.resolved_base_url(),
            access_token: config
                .access_token
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
            api_version: config.api_version.trim().to_string(),
            client: http::client_with_timeout(timeout),
        }
    }

    /// GET orders.json?limit=10&name={order_id} and project the first match.
    pub async fn order_by_name(&self, order_id: &str) -> Result<Option<OrderSummary>, ShopifyError> {
        let base = self.base_url.as_ref().ok_or(ShopifyError::NotConfigured)?;
        let token = self.access_token.as_ref().ok_or(ShopifyError::NotConfigured)?;
        let url = format!("{}/admin/api/{}/orders.json", base, self.api_version);
        let res = self
            .client
            .get(&url)
            .query(&[("limit", ORDER_PAGE_LIMIT), ("name", order_id)])
            .header("X-Shopify-Access-Token", token)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ShopifyError::Api(format!("{} {}", status, body)));
        }
        let data: OrdersResponse = res.json().await?;
        Ok(data
            .orders
            .and_then(|o| o.into_iter().next())
            .map(|o| o.into_summary(order_id)))
    }
}

#[async_trait]
impl OrderResolver for ShopifyClient {
    async fn find_order(&self, order_id: &str) -> Result<Option<OrderSummary>, ShopifyError> {
        self.order_by_name(order_id).await
    }
}
