//! Types for the pricewatch server and its HTTP API.

use pricewatch::{FlareSolverrConfig, LoopTimings};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP API listens on
    pub listen_addr: String,

    /// JSON file holding the watched products
    pub products_path: PathBuf,

    /// JSON file holding interval and notification mode
    pub settings_path: PathBuf,

    /// FlareSolverr settings for the background watcher
    pub watch_fetcher: FlareSolverrConfig,

    /// FlareSolverr settings for on-demand lookups, kept on a separate session
    pub lookup_fetcher: FlareSolverrConfig,

    /// Telegram credentials, `None` disables delivery
    pub telegram: Option<TelegramCredentials>,

    /// HTTP timeout for Telegram requests
    pub telegram_timeout: Duration,

    /// Backoffs used by the poll loop
    pub timings: LoopTimings,

    /// Start the watcher as soon as the server is up
    pub autostart: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            products_path: PathBuf::from("./watcher/products.json"),
            settings_path: PathBuf::from("./config.json"),
            watch_fetcher: FlareSolverrConfig {
                session: Some("pricewatch_watcher".to_string()),
                ..FlareSolverrConfig::default()
            },
            lookup_fetcher: FlareSolverrConfig {
                session: Some("pricewatch_api".to_string()),
                ..FlareSolverrConfig::default()
            },
            telegram: None,
            telegram_timeout: Duration::from_secs(10),
            timings: LoopTimings::default(),
            autostart: false,
        }
    }
}

/// Bot token and destination chat for alert delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramCredentials {
    pub token: String,
    pub chat_id: String,
}

/// Reply to a watcher start/stop command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    pub message: String,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Body of an on-demand price lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceRequest {
    #[serde(default)]
    pub url: String,
}

/// Successful price lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResponse {
    pub price: u64,
    pub name: String,
}

/// Failed price lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    /// Failure category (`network`, `captcha`, `price_not_found`), absent for bad requests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}
