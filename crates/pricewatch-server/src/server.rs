//! Main pricewatch server implementation.

use crate::http_server::{ApiServer, AppState};
use crate::notifier::TelegramNotifier;
use crate::store::JsonFileCatalog;
use crate::types::ServerConfig;
use pricewatch::{FlareSolverrFetcher, PriceWatcher, WatchContext, WatchMetrics};
use std::sync::Arc;
use tracing::{info, warn};

/// Pricewatch server
pub struct PricewatchServer {
    config: ServerConfig,
}

impl PricewatchServer {
    /// Create a new pricewatch server
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Build the watcher and API state from the configuration
    pub fn build_state(&self) -> Result<AppState, Box<dyn std::error::Error>> {
        let metrics = Arc::new(WatchMetrics::new());
        let catalog = JsonFileCatalog::new(&self.config.products_path, &self.config.settings_path);
        let fetcher = Arc::new(FlareSolverrFetcher::new(self.config.watch_fetcher.clone())?);
        let lookup = Arc::new(FlareSolverrFetcher::new(self.config.lookup_fetcher.clone())?);
        let notifier = Arc::new(
            TelegramNotifier::new(self.config.telegram.clone(), self.config.telegram_timeout)?
                .with_settings_source(catalog.clone()),
        );

        info!(
            settings = %catalog.settings_path().display(),
            fallback = notifier.is_configured(),
            "Telegram credentials are read from the settings file on every alert"
        );

        let context = WatchContext::new(Arc::new(catalog), fetcher, notifier)
            .with_metrics(metrics.clone())
            .with_timings(self.config.timings);

        Ok(AppState {
            watcher: Arc::new(PriceWatcher::new(context)),
            lookup,
            metrics,
        })
    }

    /// Run the server until Ctrl-C
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!(
            products = %self.config.products_path.display(),
            settings = %self.config.settings_path.display(),
            flaresolverr = %self.config.watch_fetcher.endpoint,
            "Starting pricewatch server"
        );

        let state = self.build_state()?;
        let watcher = state.watcher.clone();

        if self.config.autostart {
            watcher.start()?;
        }

        let api = ApiServer::new(state, self.config.listen_addr.clone());
        let result = api.run(shutdown_signal()).await;

        info!("Stopping watcher");
        watcher.shutdown().await;

        info!("Pricewatch server stopped");
        result
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "Could not listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
