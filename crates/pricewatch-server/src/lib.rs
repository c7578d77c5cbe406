//! Pricewatch server
//!
//! Hosts the background price watcher behind a small HTTP API.
//!
//! # Components
//!
//! - **Store**: reads the product list and runtime settings from JSON files
//! - **Notifier**: delivers alerts through Telegram
//! - **HTTP server**: watcher start/stop/status, on-demand price lookups and `/metrics`

pub mod config;
pub mod http_server;
pub mod notifier;
pub mod server;
pub mod store;
pub mod types;

pub use config::{Config, ConfigError};
pub use http_server::{ApiServer, AppState};
pub use notifier::TelegramNotifier;
pub use server::PricewatchServer;
pub use store::JsonFileCatalog;
pub use types::ServerConfig;
