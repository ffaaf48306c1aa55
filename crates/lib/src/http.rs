//! Outbound HTTP client construction shared by the WhatsApp, chat-completion and Shopify clients.

use std::time::Duration;

/// Client with a per-request timeout. If the builder fails the default client is used and the
/// missing timeout is logged.
pub fn client_with_timeout(timeout: Duration) -> reqwest::Client {
    match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            log::warn!(
                "http: could not build client with {:?} timeout ({}); requests are unbounded",
                timeout,
                e
            );
            reqwest::Client::new()
        }
    }
}
