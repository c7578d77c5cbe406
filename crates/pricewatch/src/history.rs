//! In-memory price history, one entry per product URL.

use crate::types::Product;
use std::collections::{HashMap, HashSet};

/// Last observed price per product URL
///
/// Owned by a single poll loop run, so it is dropped whenever the watcher stops.
#[derive(Debug, Default, Clone)]
pub struct PriceHistory {
    last_seen: HashMap<String, u64>,
}

impl PriceHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new observation, returning the one it replaces
    pub fn record(&mut self, url: &str, price: u64) -> Option<u64> {
        self.last_seen.insert(url.to_string(), price)
    }

    /// Last observed price for a URL
    pub fn last_price(&self, url: &str) -> Option<u64> {
        self.last_seen.get(url).copied()
    }

    /// Drop entries for URLs that are no longer monitored, returning how many were removed
    pub fn retain_products(&mut self, products: &[Product]) -> usize {
        let current: HashSet<&str> = products.iter().map(|p| p.url.as_str()).collect();
        let before = self.last_seen.len();
        self.last_seen.retain(|url, _| current.contains(url.as_str()));
        before - self.last_seen.len()
    }

    /// Number of tracked URLs
    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    /// Whether nothing has been observed yet
    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}
