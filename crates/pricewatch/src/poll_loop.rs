//! The polling worker.
//!
//! One cycle loads the catalog, fetches every product in order, folds the
//! prices into the history, dispatches alerts and publishes the next
//! [`Schedule`]. The loop then waits on a cancellable timer.

use crate::alert::{Alert, AlertDispatcher};
use crate::decision::decide;
use crate::fetchers::PriceFetcher;
use crate::history::PriceHistory;
use crate::interval::IntervalResolver;
use crate::metrics::WatchMetrics;
use crate::store::CatalogStore;
use crate::types::{NotificationMode, PriceObservation, Product, Schedule};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Fixed waits used when a cycle cannot run normally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopTimings {
    /// Wait after finding an empty product list
    pub empty_backoff: Duration,

    /// Wait after failing to load the product list or settings
    pub error_backoff: Duration,
}

impl Default for LoopTimings {
    fn default() -> Self {
        Self {
            empty_backoff: Duration::from_secs(30),
            error_backoff: Duration::from_secs(30),
        }
    }
}

/// Collaborators shared by every run of the poll loop
#[derive(Clone)]
pub struct WatchContext {
    pub store: Arc<dyn CatalogStore>,
    pub fetcher: Arc<dyn PriceFetcher>,
    pub dispatcher: Arc<dyn AlertDispatcher>,
    pub metrics: Option<Arc<WatchMetrics>>,
    pub timings: LoopTimings,
}

impl WatchContext {
    /// Create a context with default timings and no metrics
    pub fn new(
        store: Arc<dyn CatalogStore>,
        fetcher: Arc<dyn PriceFetcher>,
        dispatcher: Arc<dyn AlertDispatcher>,
    ) -> Self {
        Self {
            store,
            fetcher,
            dispatcher,
            metrics: None,
            timings: LoopTimings::default(),
        }
    }

    /// Record metrics into the given registry
    pub fn with_metrics(mut self, metrics: Arc<WatchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Override the backoff timings
    pub fn with_timings(mut self, timings: LoopTimings) -> Self {
        self.timings = timings;
        self
    }
}

/// Per-cycle accounting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Products fetched successfully
    pub checked: usize,
    /// Products whose fetch failed
    pub failed: usize,
    /// Alerts handed to the dispatcher successfully
    pub alerts_sent: usize,
    /// Interval resolved for the following wait
    pub interval_secs: u64,
}

/// How a cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every product was visited and the next check is scheduled
    Completed(CycleReport),
    /// The product list was empty
    Empty,
    /// Cancellation was observed between products
    Cancelled,
}

/// Poll loop state for one watcher run
pub struct PollLoop {
    context: WatchContext,
    resolver: IntervalResolver,
    history: PriceHistory,
    schedule: watch::Sender<Option<Schedule>>,
    cancel: CancellationToken,
}

impl PollLoop {
    /// Create a poll loop publishing its schedule on `schedule`
    pub fn new(
        context: WatchContext,
        resolver: IntervalResolver,
        cancel: CancellationToken,
        schedule: watch::Sender<Option<Schedule>>,
    ) -> Self {
        Self {
            context,
            resolver,
            history: PriceHistory::new(),
            schedule,
            cancel,
        }
    }

    /// Price history accumulated so far
    pub fn history(&self) -> &PriceHistory {
        &self.history
    }

    /// Run cycles until cancelled
    pub async fn run(mut self) {
        info!("Watcher loop started");

        while !self.cancel.is_cancelled() {
            let wait = match self.run_cycle().await {
                Ok(CycleOutcome::Completed(report)) => Duration::from_secs(report.interval_secs),
                Ok(CycleOutcome::Empty) => {
                    info!(
                        backoff_secs = self.context.timings.empty_backoff.as_secs(),
                        "No products to watch"
                    );
                    if let Some(ref m) = self.context.metrics {
                        m.record_empty_cycle();
                    }
                    self.context.timings.empty_backoff
                }
                Ok(CycleOutcome::Cancelled) => break,
                Err(e) => {
                    error!(
                        error = %e,
                        backoff_secs = self.context.timings.error_backoff.as_secs(),
                        "Watcher cycle failed"
                    );
                    if let Some(ref m) = self.context.metrics {
                        m.record_cycle_error();
                    }
                    self.context.timings.error_backoff
                }
            };

            if !self.wait(wait).await {
                break;
            }
        }

        info!("Watcher loop stopped");
    }

    /// Sleep unless cancelled first; returns false on cancellation
    async fn wait(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    /// Run a single cycle without the trailing wait
    pub async fn run_cycle(&mut self) -> common::Result<CycleOutcome> {
        let settings = self.context.store.load_settings().await?;
        let products = self.context.store.load_products().await?;

        if products.is_empty() {
            return Ok(CycleOutcome::Empty);
        }

        let evicted = self.history.retain_products(&products);
        if evicted > 0 {
            debug!(evicted, "Dropped history for removed products");
        }

        info!(
            count = products.len(),
            mode = %settings.notification_mode,
            "Checking products"
        );

        let started = Instant::now();
        let mut report = CycleReport::default();

        for product in &products {
            if self.cancel.is_cancelled() {
                return Ok(CycleOutcome::Cancelled);
            }

            match self.context.fetcher.fetch(&product.url).await {
                Ok(observation) => {
                    report.checked += 1;
                    if let Some(ref m) = self.context.metrics {
                        m.record_fetch("success");
                    }
                    if self
                        .check_product(product, observation, settings.notification_mode)
                        .await
                    {
                        report.alerts_sent += 1;
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    if let Some(ref m) = self.context.metrics {
                        m.record_fetch(e.category());
                    }
                    warn!(
                        product = product.label(),
                        url = %product.url,
                        category = e.category(),
                        error = %e,
                        "Failed to fetch product"
                    );
                }
            }
        }

        report.interval_secs = self.resolver.resolve(&settings.interval);
        self.schedule
            .send_replace(Some(Schedule::starting_now(report.interval_secs)));

        if let Some(ref m) = self.context.metrics {
            m.record_cycle(products.len(), report.interval_secs, started.elapsed());
        }

        info!(
            checked = report.checked,
            failed = report.failed,
            alerts = report.alerts_sent,
            interval_secs = report.interval_secs,
            "Cycle complete, waiting until next check"
        );

        Ok(CycleOutcome::Completed(report))
    }

    /// Fold one observation into the history and alert if the mode says so.
    /// Returns whether an alert was delivered.
    async fn check_product(
        &mut self,
        product: &Product,
        observation: PriceObservation,
        mode: NotificationMode,
    ) -> bool {
        let price = observation.price;
        let previous = self.history.record(&product.url, price);
        let name = if product.name.is_empty() {
            observation.name
        } else {
            product.name.clone()
        };

        let Some(kind) = decide(previous, price, product.target_price, mode) else {
            info!(
                product = %name,
                price,
                previous = ?previous,
                target = product.target_price,
                "Price checked"
            );
            return false;
        };

        let alert = Alert {
            kind,
            name,
            url: product.url.clone(),
            previous,
            price,
            target: product.target_price,
        };

        info!(
            product = %alert.name,
            kind = %kind,
            price,
            previous = ?previous,
            target = product.target_price,
            "Price alert"
        );

        match self.context.dispatcher.send(&alert.message()).await {
            Ok(()) => {
                if let Some(ref m) = self.context.metrics {
                    m.record_alert(kind);
                }
                true
            }
            Err(e) => {
                if let Some(ref m) = self.context.metrics {
                    m.record_dispatch_failure();
                }
                warn!(url = %product.url, error = %e, "Failed to send alert");
                false
            }
        }
    }
}
