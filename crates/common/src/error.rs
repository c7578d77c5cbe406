//! Common error types for pricewatch components.

use std::fmt;
use std::path::Path;

/// A specialized Result type for pricewatch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for pricewatch operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Other(String),
}

impl Error {
    /// Create a new store error.
    pub fn store(msg: impl fmt::Display) -> Self {
        Error::Store(msg.to_string())
    }

    /// Create a store error that names the file it came from.
    pub fn store_file(path: &Path, msg: impl fmt::Display) -> Self {
        Error::Store(format!("{}: {}", path.display(), msg))
    }

    /// Create a new configuration error.
    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new other error.
    pub fn other(msg: impl fmt::Display) -> Self {
        Error::Other(msg.to_string())
    }
}
