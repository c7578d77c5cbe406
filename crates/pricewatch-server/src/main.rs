//! Pricewatch server binary

use pricewatch_server::{Config, PricewatchServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration first (needed for logging settings)
    let yaml_config = match Config::load() {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            // Can't use tracing yet - not initialized
            eprintln!("Configuration error: {}", e);
            eprintln!("Using default configuration");
            None
        }
    };

    let (log_level, log_format) = yaml_config
        .as_ref()
        .map(|cfg| {
            (
                cfg.logging.level.clone().unwrap_or_else(|| "info".into()),
                cfg.logging.format.clone(),
            )
        })
        .unwrap_or_else(|| ("info".into(), None));

    common::logging::init_with_format(&log_level, log_format.as_deref());

    tracing::info!("Pricewatch server starting");

    let server_config = yaml_config
        .map(|cfg| {
            tracing::info!("Configuration loaded successfully");
            cfg.to_server_config()
        })
        .unwrap_or_else(|| {
            tracing::warn!("Using default configuration");
            ServerConfig::default()
        });

    PricewatchServer::new(server_config).run().await
}
