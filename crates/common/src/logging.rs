//! Logging utilities for pricewatch components.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Build the env filter, preferring `RUST_LOG` over the supplied default level.
fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Initialize tracing with sensible defaults.
///
/// Uses the RUST_LOG environment variable to control log levels.
/// Falls back to `default_level` (e.g. "info") when RUST_LOG is unset.
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter(default_level))
        .init();
}

/// Initialize tracing with JSON formatting (useful for structured logging).
pub fn init_json(default_level: &str) {
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(env_filter(default_level))
        .init();
}

/// Initialize tracing from a configured format name ("json" or anything else for text).
pub fn init_with_format(default_level: &str, format: Option<&str>) {
    match format {
        Some(f) if f.eq_ignore_ascii_case("json") => init_json(default_level),
        _ => init(default_level),
    }
}
