//! Configuration loading and validation for the pricewatch server

use crate::types::{ServerConfig, TelegramCredentials};
use pricewatch::{FlareSolverrConfig, LoopTimings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(#[from] validator::ValidationErrors),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub storage: StorageSettings,

    #[serde(default)]
    pub flaresolverr: FlareSolverrSettings,

    #[serde(default)]
    pub telegram: TelegramSettings,

    #[serde(default)]
    pub watcher: WatcherSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Validate for Config {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        self.server.validate()?;
        self.storage.validate()?;
        self.flaresolverr.validate()?;
        self.telegram.validate()?;
        self.watcher.validate()?;
        Ok(())
    }
}

/// HTTP API settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ServerSettings {
    #[validate(custom = "validate_listen_addr")]
    pub listen_addr: String,
}

/// Locations of the product list and runtime settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StorageSettings {
    #[validate(custom = "validate_file_path")]
    pub products_path: String,

    #[validate(custom = "validate_file_path")]
    pub settings_path: String,
}

/// FlareSolverr proxy settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FlareSolverrSettings {
    #[validate(custom = "validate_endpoint")]
    pub endpoint: String,

    /// Session used by the background watcher
    #[validate(length(min = 1))]
    pub session: String,

    /// Session used by on-demand lookups
    #[validate(length(min = 1))]
    pub api_session: String,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_proxy_timeout")]
    pub max_timeout: Duration,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_proxy_timeout")]
    pub request_timeout: Duration,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_proxy_timeout")]
    pub session_timeout: Duration,
}

/// Telegram chat identifier, numeric id or `@channel` name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatId {
    Id(i64),
    Name(String),
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Id(id) => write!(f, "{}", id),
            ChatId::Name(name) => f.write_str(name),
        }
    }
}

/// Telegram delivery settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct TelegramSettings {
    pub token: Option<String>,

    pub chat_id: Option<ChatId>,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_proxy_timeout")]
    pub timeout: Duration,
}

impl TelegramSettings {
    /// Credentials when both token and chat are set
    pub fn credentials(&self) -> Option<TelegramCredentials> {
        let token = self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let chat_id = self.chat_id.as_ref()?.to_string();
        if chat_id.trim().is_empty() {
            return None;
        }
        Some(TelegramCredentials {
            token: token.to_string(),
            chat_id,
        })
    }
}

/// Poll loop settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct WatcherSettings {
    pub autostart: bool,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_backoff")]
    pub empty_backoff: Duration,

    #[serde(with = "humantime_serde")]
    #[validate(custom = "validate_backoff")]
    pub error_backoff: Duration,
}

/// Logging settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: Option<String>,
    pub format: Option<String>,
}

// Default implementations

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            products_path: "./watcher/products.json".to_string(),
            settings_path: "./config.json".to_string(),
        }
    }
}

impl Default for FlareSolverrSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8191/v1".to_string(),
            session: "pricewatch_watcher".to_string(),
            api_session: "pricewatch_api".to_string(),
            max_timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(70),
            session_timeout: Duration::from_secs(30),
        }
    }
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            token: None,
            chat_id: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            autostart: false,
            empty_backoff: Duration::from_secs(30),
            error_backoff: Duration::from_secs(30),
        }
    }
}

// Custom validators

fn validate_listen_addr(addr: &str) -> Result<(), ValidationError> {
    addr.trim()
        .parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("listen_addr_invalid"))
}

fn validate_file_path(path: &str) -> Result<(), ValidationError> {
    if path.trim().is_empty() {
        return Err(ValidationError::new("file_path_empty"));
    }
    Ok(())
}

fn validate_endpoint(endpoint: &str) -> Result<(), ValidationError> {
    let trimmed = endpoint.trim();
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(ValidationError::new("endpoint_invalid_scheme"));
    }
    Ok(())
}

fn validate_proxy_timeout(timeout: &Duration) -> Result<(), ValidationError> {
    let secs = timeout.as_secs();
    if !(1..=600).contains(&secs) {
        return Err(ValidationError::new("timeout_out_of_range"));
    }
    Ok(())
}

fn validate_backoff(backoff: &Duration) -> Result<(), ValidationError> {
    let secs = backoff.as_secs();
    if !(1..=3600).contains(&secs) {
        return Err(ValidationError::new("backoff_out_of_range"));
    }
    Ok(())
}

// Configuration loading implementation

impl Config {
    /// Load configuration from default search paths
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find_config_file() {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                Self::load_from_file(&path)
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/pricewatch/pricewatch.yaml")];

        if let Some(home_path) = Self::home_config_path() {
            paths.push(home_path);
        }

        paths.push(PathBuf::from("./pricewatch.yaml"));

        paths.into_iter().find(|p| p.is_file())
    }

    /// Get home directory config path
    fn home_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/pricewatch/pricewatch.yaml"))
    }

    fn fetcher_config(&self, session: &str) -> FlareSolverrConfig {
        FlareSolverrConfig {
            endpoint: self.flaresolverr.endpoint.trim().to_string(),
            session: Some(session.to_string()),
            max_timeout: self.flaresolverr.max_timeout,
            request_timeout: self.flaresolverr.request_timeout,
            session_timeout: self.flaresolverr.session_timeout,
        }
    }

    /// Convert to the runtime server configuration
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            listen_addr: self.server.listen_addr.trim().to_string(),
            products_path: PathBuf::from(&self.storage.products_path),
            settings_path: PathBuf::from(&self.storage.settings_path),
            watch_fetcher: self.fetcher_config(&self.flaresolverr.session),
            lookup_fetcher: self.fetcher_config(&self.flaresolverr.api_session),
            telegram: self.telegram.credentials(),
            telegram_timeout: self.telegram.timeout,
            timings: LoopTimings {
                empty_backoff: self.watcher.empty_backoff,
                error_backoff: self.watcher.error_backoff,
            },
            autostart: self.watcher.autostart,
        }
    }
}
