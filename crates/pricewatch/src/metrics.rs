//! Prometheus metrics for the price watcher.

use crate::decision::AlertKind;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;
use std::time::Duration;

/// Labels for fetch result metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct FetchLabels {
    /// Result (success, network, captcha, price_not_found)
    pub result: String,
}

/// Labels for alert metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct AlertLabels {
    /// Alert kind (price_change, price_drop)
    pub kind: String,
}

/// Metrics registry with all watcher metrics
pub struct WatchMetrics {
    /// Prometheus registry
    pub registry: Registry,

    /// Completed cycles
    cycles_total: Counter,
    /// Cycles aborted by a load failure
    cycle_errors_total: Counter,
    /// Fetches by result
    fetches_total: Family<FetchLabels, Counter>,
    /// Alerts delivered by kind
    alerts_sent_total: Family<AlertLabels, Counter>,
    /// Alerts the dispatcher failed to deliver
    dispatch_failures_total: Counter,
    /// Products in the last loaded list
    products_watched: Gauge,
    /// Interval chosen for the current wait
    interval_seconds: Gauge,
    /// Time spent fetching and deciding per cycle
    cycle_duration_seconds: Histogram,
}

impl WatchMetrics {
    /// Create a new metrics registry
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let cycles_total = Counter::default();
        registry.register(
            "pricewatch_cycles",
            "Total completed watch cycles",
            cycles_total.clone(),
        );

        let cycle_errors_total = Counter::default();
        registry.register(
            "pricewatch_cycle_errors",
            "Total cycles aborted by load failures",
            cycle_errors_total.clone(),
        );

        let fetches_total = Family::<FetchLabels, Counter>::default();
        registry.register(
            "pricewatch_fetches",
            "Total product fetches by result",
            fetches_total.clone(),
        );

        let alerts_sent_total = Family::<AlertLabels, Counter>::default();
        registry.register(
            "pricewatch_alerts_sent",
            "Total alerts sent by kind",
            alerts_sent_total.clone(),
        );

        let dispatch_failures_total = Counter::default();
        registry.register(
            "pricewatch_dispatch_failures",
            "Total alerts that failed to send",
            dispatch_failures_total.clone(),
        );

        let products_watched = Gauge::default();
        registry.register(
            "pricewatch_products_watched",
            "Number of products in the current list",
            products_watched.clone(),
        );

        let interval_seconds = Gauge::default();
        registry.register(
            "pricewatch_interval_seconds",
            "Interval chosen for the current wait",
            interval_seconds.clone(),
        );

        // 100ms to ~7min, fetches through the proxy are slow
        let cycle_duration_seconds = Histogram::new(exponential_buckets(0.1, 2.0, 12));
        registry.register(
            "pricewatch_cycle_duration_seconds",
            "Time spent checking all products in a cycle",
            cycle_duration_seconds.clone(),
        );

        Self {
            registry,
            cycles_total,
            cycle_errors_total,
            fetches_total,
            alerts_sent_total,
            dispatch_failures_total,
            products_watched,
            interval_seconds,
            cycle_duration_seconds,
        }
    }

    /// Record a fetch outcome
    pub fn record_fetch(&self, result: &str) {
        self.fetches_total
            .get_or_create(&FetchLabels {
                result: result.to_string(),
            })
            .inc();
    }

    /// Record a delivered alert
    pub fn record_alert(&self, kind: AlertKind) {
        self.alerts_sent_total
            .get_or_create(&AlertLabels {
                kind: kind.as_str().to_string(),
            })
            .inc();
    }

    /// Record a failed delivery
    pub fn record_dispatch_failure(&self) {
        self.dispatch_failures_total.inc();
    }

    /// Record a completed cycle
    pub fn record_cycle(&self, products: usize, interval_secs: u64, duration: Duration) {
        self.cycles_total.inc();
        self.products_watched.set(products as i64);
        self.interval_seconds.set(interval_secs as i64);
        self.cycle_duration_seconds.observe(duration.as_secs_f64());
    }

    /// Record a cycle aborted before checking products
    pub fn record_cycle_error(&self) {
        self.cycle_errors_total.inc();
    }

    /// Record that the product list was empty
    pub fn record_empty_cycle(&self) {
        self.products_watched.set(0);
    }

    /// Completed cycles so far
    pub fn cycles(&self) -> u64 {
        self.cycles_total.get()
    }

    /// Delivered alerts of one kind so far
    pub fn alerts_sent(&self, kind: AlertKind) -> u64 {
        self.alerts_sent_total
            .get_or_create(&AlertLabels {
                kind: kind.as_str().to_string(),
            })
            .get()
    }

    /// Fetches with one result so far
    pub fn fetches(&self, result: &str) -> u64 {
        self.fetches_total
            .get_or_create(&FetchLabels {
                result: result.to_string(),
            })
            .get()
    }
}

impl Default for WatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::encoding::text::encode;

    #[test]
    fn test_counters() {
        let metrics = WatchMetrics::new();
        metrics.record_fetch("success");
        metrics.record_fetch("success");
        metrics.record_fetch("captcha");
        metrics.record_alert(AlertKind::PriceDrop);
        metrics.record_cycle(3, 120, Duration::from_secs(4));

        assert_eq!(metrics.fetches("success"), 2);
        assert_eq!(metrics.fetches("captcha"), 1);
        assert_eq!(metrics.alerts_sent(AlertKind::PriceDrop), 1);
        assert_eq!(metrics.alerts_sent(AlertKind::PriceChange), 0);
        assert_eq!(metrics.cycles(), 1);
    }

    #[test]
    fn test_encoding() {
        let metrics = WatchMetrics::new();
        metrics.record_fetch("network");
        metrics.record_dispatch_failure();
        metrics.record_cycle_error();

        let mut buffer = String::new();
        encode(&mut buffer, &metrics.registry).unwrap();
        assert!(buffer.contains("pricewatch_fetches_total{result=\"network\"} 1"));
        assert!(buffer.contains("pricewatch_dispatch_failures_total 1"));
        assert!(buffer.contains("pricewatch_cycle_errors_total 1"));
    }
}
