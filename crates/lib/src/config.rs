//! Configuration types and loading.
//!
//! Config is loaded once from a JSON file (e.g. `~/.relay/config.json`), then environment
//! overrides are applied. The resulting value is immutable and shared by reference.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Persona used when neither `reply.persona` nor a PERSONA.md file is present.
pub const DEFAULT_PERSONA: &str = include_str!("../config/PERSONA.md");

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// WhatsApp Cloud API credentials and endpoint.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Chat-completion endpoint used for the base reply.
    #[serde(default)]
    pub llm: LlmConfig,

    /// Shopify store used for order lookups. Order lookup is disabled when unset.
    #[serde(default)]
    pub shopify: ShopifyConfig,

    /// Reply text settings.
    #[serde(default)]
    pub reply: ReplyConfig,

    /// Outbound HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Gateway bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Port for HTTP (default 3000). Overridden by PORT env.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "0.0.0.0"; the platform must reach the webhook).
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_gateway_bind() -> String {
    "0.0.0.0".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// WhatsApp Cloud API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppConfig {
    /// Shared secret for the subscription handshake. Overridden by META_VERIFY_TOKEN env.
    pub verify_token: Option<String>,
    /// Bearer token for the send-message API. Overridden by META_ACCESS_TOKEN env.
    pub access_token: Option<String>,
    /// Sending phone number id. Overridden by META_PHONE_NUMBER_ID env.
    pub phone_number_id: Option<String>,
    /// Graph API host (default "https://graph.facebook.com").
    #[serde(default = "default_whatsapp_api_base")]
    pub api_base: String,
    /// Graph API version segment (default "v16.0").
    #[serde(default = "default_whatsapp_api_version")]
    pub api_version: String,
}

fn default_whatsapp_api_base() -> String {
    "https://graph.facebook.com".to_string()
}

fn default_whatsapp_api_version() -> String {
    "v16.0".to_string()
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            verify_token: None,
            access_token: None,
            phone_number_id: None,
            api_base: default_whatsapp_api_base(),
            api_version: default_whatsapp_api_version(),
        }
    }
}

/// OpenAI-compatible chat-completion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    /// API key. Overridden by OPENAI_API_KEY env.
    pub api_key: Option<String>,
    /// Base URL including the version path (default "https://api.openai.com/v1").
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4-turbo".to_string()
}

fn default_llm_temperature() -> f32 {
    0.2
}

fn default_llm_max_tokens() -> u32 {
    400
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            temperature: default_llm_temperature(),
            max_tokens: default_llm_max_tokens(),
        }
    }
}

/// Shopify Admin API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopifyConfig {
    /// Store domain, e.g. "your-shop.myshopify.com". Overridden by SHOPIFY_STORE_DOMAIN env.
    pub store_domain: Option<String>,
    /// Admin API access token. Overridden by SHOPIFY_ADMIN_TOKEN env.
    pub access_token: Option<String>,
    /// Admin API version (default "2024-10").
    #[serde(default = "default_shopify_api_version")]
    pub api_version: String,
    /// Full base URL replacing `https://{storeDomain}` (for proxies and tests).
    pub base_url: Option<String>,
}

fn default_shopify_api_version() -> String {
    "2024-10".to_string()
}

impl Default for ShopifyConfig {
    fn default() -> Self {
        Self {
            store_domain: None,
            access_token: None,
            api_version: default_shopify_api_version(),
            base_url: None,
        }
    }
}

impl ShopifyConfig {
    /// Base URL for Admin API calls, when the store is configured.
    pub fn resolved_base_url(&self) -> Option<String> {
        self.base_url
            .as_deref()
            .and_then(non_empty)
            .map(|u| u.trim_end_matches('/').to_string())
            .or_else(|| {
                self.store_domain
                    .as_deref()
                    .and_then(non_empty)
                    .map(|d| format!("https://{}", d.trim_end_matches('/')))
            })
    }

    /// True when both a store and an access token are set.
    pub fn is_configured(&self) -> bool {
        self.resolved_base_url().is_some()
            && self.access_token.as_deref().and_then(non_empty).is_some()
    }
}

/// Reply text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyConfig {
    /// Inline persona prompt. Takes precedence over PERSONA.md.
    pub persona: Option<String>,
    /// Text substituted when an inbound message has no text (default "Hi").
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_greeting() -> String {
    "Hi".to_string()
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            persona: None,
            greeting: default_greeting(),
        }
    }
}

/// Outbound HTTP settings shared by all clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    /// Per-request timeout in seconds (default 20).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    20
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

fn non_empty(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() {
        None
    } else {
        Some(t.to_string())
    }
}

impl Config {
    /// Apply process environment overrides (env wins over file; blank values are ignored).
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Used by `with_env_overrides` and tests.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).as_deref().and_then(non_empty);

        if let Some(port) = get("PORT") {
            match port.parse::<u16>() {
                Ok(p) => self.gateway.port = p,
                Err(_) => log::warn!("ignoring invalid PORT value: {}", port),
            }
        }
        if let Some(v) = get("META_VERIFY_TOKEN") {
            self.whatsapp.verify_token = Some(v);
        }
        if let Some(v) = get("META_ACCESS_TOKEN") {
            self.whatsapp.access_token = Some(v);
        }
        if let Some(v) = get("META_PHONE_NUMBER_ID") {
            self.whatsapp.phone_number_id = Some(v);
        }
        if let Some(v) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(v);
        }
        if let Some(v) = get("SHOPIFY_STORE_DOMAIN") {
            self.shopify.store_domain = Some(v);
        }
        if let Some(v) = get("SHOPIFY_ADMIN_TOKEN") {
            self.shopify.access_token = Some(v);
        }
        self
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("RELAY_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".relay").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path (or the default path). Missing file => default config.
/// Returns the config and the path that was used (for locating PERSONA.md).
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Directory holding the config file.
pub fn config_dir(config_path: &Path) -> &Path {
    config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Resolve the persona prompt: `reply.persona`, then PERSONA.md next to the config file,
/// then the bundled default.
pub fn resolve_persona(config: &Config, config_path: &Path) -> String {
    if let Some(p) = config.reply.persona.as_deref().and_then(non_empty) {
        return p;
    }
    let file = config_dir(config_path).join("PERSONA.md");
    match std::fs::read_to_string(&file) {
        Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => DEFAULT_PERSONA.trim().to_string(),
    }
}
