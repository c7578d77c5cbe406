//! Background price monitoring for web product pages.
//!
//! This crate provides the polling engine behind pricewatch:
//! - Interval parsing with fixed, minute and randomized forms
//! - Product page fetching through FlareSolverr
//! - Per-product price history across cycles
//! - Configurable alert policies (`any_change`, `below_target`, `both`, `none`)
//! - A start/stop/status controller over a cancellable worker task
//!
//! # Example
//!
//! ```no_run
//! use pricewatch::{
//!     FlareSolverrConfig, FlareSolverrFetcher, MemoryCatalog, NullDispatcher, PriceWatcher,
//!     Product, WatchContext, WatchSettings,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = MemoryCatalog::new(
//!     vec![Product::new("https://shop.example/bike", 1000)],
//!     WatchSettings::default(),
//! );
//! let fetcher = FlareSolverrFetcher::new(FlareSolverrConfig::default())?;
//! let context = WatchContext::new(Arc::new(catalog), Arc::new(fetcher), Arc::new(NullDispatcher));
//!
//! let watcher = PriceWatcher::new(context);
//! watcher.start()?;
//!
//! let status = watcher.status();
//! println!("running: {}, next check in {:?}s", status.is_running, status.countdown);
//! watcher.stop()?;
//! # Ok(())
//! # }
//! ```

pub mod alert;
pub mod decision;
pub mod fetchers;
pub mod history;
pub mod interval;
pub mod metrics;
pub mod poll_loop;
pub mod store;
pub mod types;
pub mod watcher;

pub use alert::{Alert, AlertDispatcher, DispatchError, NullDispatcher};
pub use decision::{decide, AlertKind};
pub use fetchers::{FetchError, FlareSolverrConfig, FlareSolverrFetcher, PriceFetcher};
pub use history::PriceHistory;
pub use interval::{IntervalResolver, IntervalSpec, FALLBACK_INTERVAL_SECS};
pub use metrics::WatchMetrics;
pub use poll_loop::{CycleOutcome, CycleReport, LoopTimings, PollLoop, WatchContext};
pub use store::{CatalogStore, MemoryCatalog};
pub use types::{
    NotificationMode, Phase, PriceObservation, Product, Schedule, WatchSettings, WatcherStatus,
};
pub use watcher::{PriceWatcher, WatcherError};
