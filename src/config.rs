//! Notification configuration.
//!
//! ## Environment variables
//!
//! - `NOTIFY_BASE_URL`: public base URL of the server (default: `http://localhost:3000`)
//! - `NOTIFY_WEBSOCKET_BASE`: prefix of generated `receiveFrom` URLs
//!   (default: derived from the base URL)
//! - `NOTIFY_MAX_DURATION_SECS`: cap on channel lifetime, `0` disables (default: 2 weeks)
//! - `NOTIFY_AUTHORIZATION_TIMEOUT_MS`: authorizer deadline (default: 5000)
//! - `NOTIFY_WEBHOOK_TYPE`: channel-type identifier of the webhook type
//! - `NOTIFY_WEBSOCKET_TYPE`: channel-type identifier of the socket type
//!
//! Unparseable values are logged and replaced by the default.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

use crate::types::vocab::{compact_iri, expand_iri, notify};

/// Path under the base URL where subscription endpoints live.
pub const NOTIFICATIONS_PATH: &str = ".notifications/";

/// Default channel lifetime cap (two weeks).
pub const DEFAULT_MAX_DURATION_SECS: u64 = 14 * 24 * 60 * 60;

/// Default authorizer deadline.
pub const DEFAULT_AUTHORIZATION_TIMEOUT_MS: u64 = 5_000;

/// Configuration shared by the registry, channel types and pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Public base URL, with trailing slash.
    pub base_url: String,
    /// Prefix of generated socket URLs, with trailing slash.
    pub websocket_base: String,
    /// Maximum channel lifetime in seconds; `None` means unbounded.
    pub max_duration_secs: Option<u64>,
    /// Authorizer deadline in milliseconds.
    pub authorization_timeout_ms: u64,
    /// Channel-type IRI of the webhook type.
    pub webhook_type: String,
    /// Channel-type IRI of the socket type.
    pub websocket_type: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self::with_base_url("http://localhost:3000/")
    }
}

impl NotificationConfig {
    /// Defaults for a server reachable at `base_url`.
    pub fn with_base_url(base_url: &str) -> Self {
        let base_url = with_trailing_slash(base_url);
        let websocket_type = notify("WebSocketChannel2023");
        Self {
            websocket_base: default_websocket_base(&base_url, &websocket_type),
            base_url,
            max_duration_secs: Some(DEFAULT_MAX_DURATION_SECS),
            authorization_timeout_ms: DEFAULT_AUTHORIZATION_TIMEOUT_MS,
            webhook_type: notify("WebhookChannel2023"),
            websocket_type,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let base_url = std::env::var("NOTIFY_BASE_URL").unwrap_or_else(|_| {
            warn!("NOTIFY_BASE_URL not set, using http://localhost:3000/");
            "http://localhost:3000/".to_string()
        });
        let mut config = Self::with_base_url(&base_url);

        if let Ok(ty) = std::env::var("NOTIFY_WEBSOCKET_TYPE") {
            config.websocket_type = expand_iri(&ty);
            config.websocket_base =
                default_websocket_base(&config.base_url, &config.websocket_type);
        }
        if let Ok(base) = std::env::var("NOTIFY_WEBSOCKET_BASE") {
            config.websocket_base = with_trailing_slash(&base);
        }
        if let Ok(ty) = std::env::var("NOTIFY_WEBHOOK_TYPE") {
            config.webhook_type = expand_iri(&ty);
        }
        if let Some(secs) = env_u64("NOTIFY_MAX_DURATION_SECS") {
            config.max_duration_secs = (secs > 0).then_some(secs);
        }
        if let Some(ms) = env_u64("NOTIFY_AUTHORIZATION_TIMEOUT_MS") {
            config.authorization_timeout_ms = ms;
        }
        config
    }

    /// Subscription endpoint advertised for a channel type.
    pub fn subscription_endpoint(&self, channel_type: &str) -> String {
        format!("{}{}{}/", self.base_url, NOTIFICATIONS_PATH, compact_iri(channel_type))
    }

    /// Storage description endpoint.
    pub fn description_endpoint(&self) -> String {
        format!("{}{}", self.base_url, NOTIFICATIONS_PATH)
    }

    /// Maximum channel lifetime.
    pub fn max_duration(&self) -> Option<Duration> {
        self.max_duration_secs.map(Duration::from_secs)
    }

    /// Authorizer deadline.
    pub fn authorization_timeout(&self) -> Duration {
        Duration::from_millis(self.authorization_timeout_ms)
    }
}

fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

fn default_websocket_base(base_url: &str, websocket_type: &str) -> String {
    let socket_base = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base_url.to_string()
    };
    format!("{socket_base}{NOTIFICATIONS_PATH}{}/", compact_iri(websocket_type))
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(variable = name, value = %raw, "ignoring unparseable configuration value");
            None
        }
    }
}
