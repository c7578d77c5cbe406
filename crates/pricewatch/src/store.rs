//! Product list and settings sources.

use crate::types::{Product, WatchSettings};
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Source of the product list and watch settings, read once per cycle
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Load all products in stored order
    async fn load_products(&self) -> common::Result<Vec<Product>>;

    /// Load the current watch settings
    async fn load_settings(&self) -> common::Result<WatchSettings>;
}

/// Catalog held in memory
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: RwLock<Vec<Product>>,
    settings: RwLock<WatchSettings>,
}

impl MemoryCatalog {
    /// Create a catalog with the given contents
    pub fn new(products: Vec<Product>, settings: WatchSettings) -> Self {
        Self {
            products: RwLock::new(products),
            settings: RwLock::new(settings),
        }
    }

    /// Replace the product list
    pub async fn set_products(&self, products: Vec<Product>) {
        *self.products.write().await = products;
    }

    /// Replace the settings
    pub async fn set_settings(&self, settings: WatchSettings) {
        *self.settings.write().await = settings;
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn load_products(&self) -> common::Result<Vec<Product>> {
        Ok(self.products.read().await.clone())
    }

    async fn load_settings(&self) -> common::Result<WatchSettings> {
        Ok(self.settings.read().await.clone())
    }
}
