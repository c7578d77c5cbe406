//! Integration tests for the watcher lifecycle and poll loop timing

use async_trait::async_trait;
use pricewatch::{
    AlertDispatcher, CatalogStore, DispatchError, FetchError, MemoryCatalog, NotificationMode,
    Phase, PriceFetcher, PriceObservation, PriceWatcher, Product, WatchContext, WatchMetrics,
    WatchSettings, WatcherError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// Catalog that counts loads and can be switched into a failing mode
#[derive(Default)]
struct CountingCatalog {
    inner: MemoryCatalog,
    loads: AtomicUsize,
    failing: bool,
}

impl CountingCatalog {
    fn new(products: Vec<Product>, interval: &str, mode: NotificationMode) -> Self {
        Self {
            inner: MemoryCatalog::new(
                products,
                WatchSettings {
                    interval: interval.to_string(),
                    notification_mode: mode,
                },
            ),
            loads: AtomicUsize::new(0),
            failing: false,
        }
    }

    fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogStore for CountingCatalog {
    async fn load_products(&self) -> common::Result<Vec<Product>> {
        self.inner.load_products().await
    }

    async fn load_settings(&self) -> common::Result<WatchSettings> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(common::Error::store("config.json: expected value at line 1"));
        }
        self.inner.load_settings().await
    }
}

/// Fetcher with per-URL prices and an optional artificial delay
#[derive(Default)]
struct StubFetcher {
    prices: Mutex<HashMap<String, u64>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubFetcher {
    fn with_prices(prices: &[(&str, u64)]) -> Self {
        let fetcher = Self::default();
        for (url, price) in prices {
            fetcher.set(url, *price);
        }
        fetcher
    }

    fn set(&self, url: &str, price: u64) {
        self.prices.lock().unwrap().insert(url.to_string(), price);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<PriceObservation, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let price = self.prices.lock().unwrap().get(url).copied();
        price
            .map(|price| PriceObservation {
                price,
                name: url.to_string(),
            })
            .ok_or_else(|| FetchError::PriceNotFound("page structure may have changed".into()))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Dispatcher that records every message
#[derive(Default)]
struct RecordingDispatcher {
    messages: Mutex<Vec<String>>,
}

impl RecordingDispatcher {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertDispatcher for RecordingDispatcher {
    async fn send(&self, text: &str) -> Result<(), DispatchError> {
        self.messages.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn watcher(
    catalog: Arc<CountingCatalog>,
    fetcher: Arc<StubFetcher>,
    dispatcher: Arc<RecordingDispatcher>,
) -> PriceWatcher {
    PriceWatcher::new(WatchContext::new(catalog, fetcher, dispatcher)).with_resolver_seed(11)
}

#[tokio::test(start_paused = true)]
async fn test_second_start_is_rejected_and_single_worker_runs() {
    let catalog = Arc::new(CountingCatalog::new(
        vec![Product::new("https://a", 100)],
        "120",
        NotificationMode::BelowTarget,
    ));
    let fetcher = Arc::new(StubFetcher::with_prices(&[("https://a", 150)]));
    let watcher = watcher(catalog.clone(), fetcher.clone(), Arc::default());

    watcher.start().unwrap();
    assert_eq!(watcher.start(), Err(WatcherError::AlreadyRunning));

    sleep(Duration::from_secs(1)).await;
    assert_eq!(catalog.loads(), 1);
    assert_eq!(fetcher.calls().len(), 1);

    let status = watcher.status();
    assert!(status.is_running);
    assert_eq!(status.interval, Some(120));
    assert_eq!(status.countdown, Some(119));

    sleep(Duration::from_secs(120)).await;
    assert_eq!(catalog.loads(), 2);

    watcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_takes_effect_at_next_checkpoint() {
    let catalog = Arc::new(CountingCatalog::new(
        vec![Product::new("https://a", 100)],
        "600",
        NotificationMode::BelowTarget,
    ));
    let fetcher = Arc::new(StubFetcher::with_prices(&[("https://a", 150)]));
    let watcher = watcher(catalog.clone(), fetcher, Arc::default());

    watcher.start().unwrap();
    sleep(Duration::from_secs(5)).await;

    watcher.stop().unwrap();
    let status = watcher.status();
    assert_eq!(status.status, Phase::Stopped);
    assert!(status.countdown.is_none());
    assert!(status.interval.is_none());

    sleep(Duration::from_secs(3600)).await;
    assert_eq!(catalog.loads(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_in_flight_fetch() {
    let catalog = Arc::new(CountingCatalog::new(
        vec![Product::new("https://a", 100), Product::new("https://b", 100)],
        "60",
        NotificationMode::BelowTarget,
    ));
    let fetcher = Arc::new(StubFetcher {
        delay: Some(Duration::from_secs(20)),
        ..StubFetcher::with_prices(&[("https://a", 150), ("https://b", 150)])
    });
    let watcher = watcher(catalog, fetcher.clone(), Arc::default());

    watcher.start().unwrap();
    sleep(Duration::from_secs(5)).await;
    watcher.stop().unwrap();
    assert!(!watcher.status().is_running);

    watcher.shutdown().await;
    assert_eq!(fetcher.calls(), vec!["https://a"]);
}

#[tokio::test(start_paused = true)]
async fn test_restart_during_fetch_waits_for_previous_worker() {
    let catalog = Arc::new(CountingCatalog::new(
        vec![Product::new("https://a", 100), Product::new("https://b", 100)],
        "600",
        NotificationMode::BelowTarget,
    ));
    let fetcher = Arc::new(StubFetcher {
        delay: Some(Duration::from_secs(20)),
        ..StubFetcher::with_prices(&[("https://a", 150), ("https://b", 150)])
    });
    let watcher = watcher(catalog, fetcher.clone(), Arc::default());

    watcher.start().unwrap();
    sleep(Duration::from_secs(5)).await;
    watcher.stop().unwrap();
    watcher.start().unwrap();
    assert!(watcher.is_running());

    sleep(Duration::from_secs(5)).await;
    assert_eq!(fetcher.calls(), vec!["https://a"]);

    // old worker exits at 20s, the new run fetches a (20s..40s) then b
    sleep(Duration::from_secs(35)).await;
    assert_eq!(fetcher.calls(), vec!["https://a", "https://a", "https://b"]);
    assert_eq!(fetcher.max_in_flight(), 1);

    watcher.shutdown().await;
    assert_eq!(fetcher.max_in_flight(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_is_non_increasing() {
    let catalog = Arc::new(CountingCatalog::new(
        vec![Product::new("https://a", 100)],
        "random:100-200",
        NotificationMode::BelowTarget,
    ));
    let fetcher = Arc::new(StubFetcher::with_prices(&[("https://a", 150)]));
    let watcher = watcher(catalog, fetcher, Arc::default());

    watcher.start().unwrap();
    sleep(Duration::from_millis(500)).await;

    let interval = watcher.status().interval.unwrap();
    assert!((100..=200).contains(&interval));

    let mut last = watcher.status().countdown.unwrap();
    for _ in 0..12 {
        sleep(Duration::from_secs(7)).await;
        let countdown = watcher.status().countdown.unwrap();
        assert!(countdown <= last, "countdown went from {last} to {countdown}");
        last = countdown;
    }

    watcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_empty_catalog_backs_off_without_schedule() {
    let catalog = Arc::new(CountingCatalog::new(Vec::new(), "10", NotificationMode::BelowTarget));
    let fetcher = Arc::new(StubFetcher::default());
    let watcher = watcher(catalog.clone(), fetcher.clone(), Arc::default());

    watcher.start().unwrap();
    sleep(Duration::from_secs(29)).await;
    assert_eq!(catalog.loads(), 1);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(catalog.loads(), 2);

    let status = watcher.status();
    assert!(status.is_running);
    assert!(status.interval.is_none());
    assert!(status.countdown.is_none());
    assert!(fetcher.calls().is_empty());

    watcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_load_failure_retries_after_backoff() {
    let catalog = Arc::new(CountingCatalog {
        failing: true,
        ..CountingCatalog::new(vec![Product::new("https://a", 100)], "10", NotificationMode::Both)
    });
    let metrics = Arc::new(WatchMetrics::new());
    let context = WatchContext::new(
        catalog.clone(),
        Arc::new(StubFetcher::default()),
        Arc::new(RecordingDispatcher::default()),
    )
    .with_metrics(metrics.clone());
    let watcher = PriceWatcher::new(context);

    watcher.start().unwrap();
    sleep(Duration::from_secs(95)).await;

    // loads at 0s, 30s, 60s and 90s
    assert_eq!(catalog.loads(), 4);
    assert!(watcher.is_running());
    assert!(watcher.status().interval.is_none());
    assert_eq!(metrics.cycles(), 0);

    watcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_failed_product_does_not_block_later_products() {
    let catalog = Arc::new(CountingCatalog::new(
        vec![
            Product::new("https://a", 100),
            Product::new("https://missing", 100),
            Product::new("https://c", 100),
        ],
        "90",
        NotificationMode::BelowTarget,
    ));
    let fetcher = Arc::new(StubFetcher::with_prices(&[("https://a", 120), ("https://c", 80)]));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let watcher = watcher(catalog, fetcher.clone(), dispatcher.clone());

    watcher.start().unwrap();
    sleep(Duration::from_secs(1)).await;

    assert_eq!(fetcher.calls(), vec!["https://a", "https://missing", "https://c"]);
    assert_eq!(dispatcher.messages().len(), 1);
    assert!(dispatcher.messages()[0].contains("https://c"));
    assert_eq!(watcher.status().interval, Some(90));

    watcher.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_restart_clears_price_history() {
    let catalog = Arc::new(CountingCatalog::new(
        vec![Product::new("https://a", 50).with_name("Lamp")],
        "120",
        NotificationMode::AnyChange,
    ));
    let fetcher = Arc::new(StubFetcher::with_prices(&[("https://a", 100)]));
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let watcher = watcher(catalog, fetcher.clone(), dispatcher.clone());

    watcher.start().unwrap();
    sleep(Duration::from_secs(1)).await;
    watcher.shutdown().await;

    // new run: first sighting only seeds history
    fetcher.set("https://a", 90);
    watcher.start().unwrap();
    sleep(Duration::from_secs(1)).await;
    assert!(dispatcher.messages().is_empty());

    fetcher.set("https://a", 80);
    sleep(Duration::from_secs(120)).await;
    assert_eq!(
        dispatcher.messages(),
        vec!["PRICE CHANGE: Lamp changed from 90 € to 80 € (target 50 €)\nhttps://a"]
    );

    watcher.shutdown().await;
}
