//! Gateway HTTP server: health probe plus the WhatsApp webhook (verify + receive).

use crate::channels::{extract_event, ChannelHandle, WebhookEvent, WhatsAppClient};
use crate::config::{self, Config};
use crate::llm::OpenAiClient;
use crate::orders::{OrderResolver, ShopifyClient};
use crate::reply::ReplyComposer;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

/// Acknowledgment body once a reply has been sent.
const EVENT_RECEIVED: &str = "EVENT_RECEIVED";
/// Acknowledgment body when the reply could not be sent. Still a 200 so the platform does not redeliver.
const SEND_FAILED: &str = "SEND_FAILED";

/// Shared, immutable state for request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub composer: ReplyComposer,
    /// Where replies are sent (the WhatsApp Cloud API in production).
    pub channel: Arc<dyn ChannelHandle>,
}

impl GatewayState {
    pub fn new(config: Config, composer: ReplyComposer, channel: Arc<dyn ChannelHandle>) -> Self {
        Self {
            config: Arc::new(config),
            composer,
            channel,
        }
    }

    /// Build the production clients from config. Order lookup is enabled only when the
    /// Shopify store and token are both set.
    pub fn from_config(config: Config, persona: String) -> Self {
        let composer = build_composer(&config, persona);
        let timeout = config.http.timeout();
        let channel: Arc<dyn ChannelHandle> =
            Arc::new(WhatsAppClient::new(&config.whatsapp, timeout));
        Self::new(config, composer, channel)
    }
}

/// Reply composer backed by the configured language model and, when configured, Shopify.
pub fn build_composer(config: &Config, persona: String) -> ReplyComposer {
    let timeout = config.http.timeout();
    let responder = Arc::new(OpenAiClient::new(&config.llm, timeout));
    let orders: Option<Arc<dyn OrderResolver>> = if config.shopify.is_configured() {
        Some(Arc::new(ShopifyClient::new(&config.shopify, timeout)))
    } else {
        None
    };
    ReplyComposer::new(responder, orders, persona, config.reply.greeting.clone())
}

/// Log what is missing so a half-configured deployment is obvious at startup.
fn log_configuration_gaps(config: &Config, composer: &ReplyComposer) {
    if config.whatsapp.verify_token.is_none() {
        log::warn!("whatsapp verify token not set (META_VERIFY_TOKEN); webhook verification will be refused");
    }
    if config.whatsapp.access_token.is_none() || config.whatsapp.phone_number_id.is_none() {
        log::warn!("whatsapp access token or phone number id not set; replies cannot be sent");
    }
    if config.llm.api_key.is_none() {
        log::warn!("llm api key not set (OPENAI_API_KEY); model replies will fall back to an apology");
    }
    if composer.order_lookup_enabled() {
        log::info!("order lookup enabled");
    } else {
        log::info!("order lookup disabled (set SHOPIFY_STORE_DOMAIN and SHOPIFY_ADMIN_TOKEN to enable)");
    }
}

/// Routes: `GET /` health, `GET /webhook` verification, `POST /webhook` message delivery.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/webhook", get(verify_webhook).post(receive_webhook))
        .with_state(state)
}

/// Run the gateway server; binds to config.gateway.bind:config.gateway.port.
/// Blocks until shutdown (e.g. Ctrl+C).
/// `config_path` is the path to the config file (used to locate PERSONA.md).
pub async fn run_gateway(config: Config, config_path: PathBuf) -> Result<()> {
    let persona = config::resolve_persona(&config, &config_path);
    let state = GatewayState::from_config(config, persona);
    log_configuration_gaps(&state.config, &state.composer);

    let bind_addr = format!("{}:{}", state.config.gateway.bind.trim(), state.config.gateway.port);
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
        "orderLookup": state.composer.order_lookup_enabled(),
    }))
}

/// Subscription handshake parameters. All optional: an absent or empty mode or token is answered
/// with 400, not a rejection.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// GET /webhook: echo the challenge when mode is "subscribe" and the token matches.
async fn verify_webhook(
    State(state): State<GatewayState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    let mode = query.mode.as_deref().filter(|m| !m.is_empty());
    let token = query.verify_token.as_deref().filter(|t| !t.is_empty());
    let (Some(mode), Some(token)) = (mode, token) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let expected = state
        .config
        .whatsapp
        .verify_token
        .as_deref()
        .filter(|t| !t.is_empty());
    if mode == "subscribe" && expected == Some(token) {
        log::info!("webhook verified");
        (StatusCode::OK, query.challenge.unwrap_or_default()).into_response()
    } else {
        log::warn!("webhook verification refused (mode {:?})", mode);
        StatusCode::FORBIDDEN.into_response()
    }
}

/// POST /webhook: extract the first message, compose a reply, send it, acknowledge.
///
/// Payloads without a message are acknowledged without any outbound call. A failed send is
/// logged and still acknowledged with 200 so that the platform does not redeliver the event.
async fn receive_webhook(
    State(state): State<GatewayState>,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let event = match extract_event(&body) {
        WebhookEvent::Message(ev) => ev,
        WebhookEvent::NoEvent(reason) => {
            log::debug!("webhook: nothing to answer ({})", reason.as_str());
            return (StatusCode::OK, reason.as_str());
        }
    };
    log::info!(
        "incoming message from {} type {} body {:?}",
        event.sender_id,
        event.message_type,
        event.text
    );

    let reply = state.composer.compose(&event.sender_id, &event.text).await;

    match state.channel.send_message(&event.sender_id, &reply).await {
        Ok(()) => {
            log::debug!("reply sent to {} via {}", event.sender_id, state.channel.id());
            (StatusCode::OK, EVENT_RECEIVED)
        }
        Err(e) => {
            log::error!("sending reply to {} failed: {}", event.sender_id, e);
            (StatusCode::OK, SEND_FAILED)
        }
    }
}
