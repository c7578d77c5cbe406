//! JSON file backed product catalog.
//!
//! Both files are re-read on every call so edits made while the watcher runs
//! are picked up by the next cycle.

use crate::types::TelegramCredentials;
use async_trait::async_trait;
use common::{Error, Result};
use pricewatch::{CatalogStore, NotificationMode, Product, WatchSettings};
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Catalog reading `products.json` and `config.json`
#[derive(Debug, Clone)]
pub struct JsonFileCatalog {
    products_path: PathBuf,
    settings_path: PathBuf,
}

impl JsonFileCatalog {
    pub fn new(products_path: impl Into<PathBuf>, settings_path: impl Into<PathBuf>) -> Self {
        Self {
            products_path: products_path.into(),
            settings_path: settings_path.into(),
        }
    }

    pub fn products_path(&self) -> &Path {
        &self.products_path
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Parsed `config.json`, `None` when the file does not exist
    async fn read_settings(&self) -> Result<Option<Value>> {
        let Some(contents) = read_optional(&self.settings_path).await? else {
            return Ok(None);
        };

        let value: Value =
            serde_json::from_str(&contents).map_err(|e| Error::store_file(&self.settings_path, e))?;
        if !value.is_object() {
            return Err(Error::store_file(
                &self.settings_path,
                "expected a JSON object",
            ));
        }
        Ok(Some(value))
    }

    /// Telegram credentials stored next to the watch settings
    ///
    /// `None` unless both `telegram_token` and `telegram_chat_id` are set.
    pub async fn load_telegram_credentials(&self) -> Result<Option<TelegramCredentials>> {
        Ok(self
            .read_settings()
            .await?
            .and_then(|value| credentials_from_value(&value)))
    }
}

/// Read a file, mapping "not found" to `None`
async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::store_file(path, e)),
    }
}

/// Build watch settings from a parsed `config.json` object
///
/// The interval may be stored as a string or a bare number. Anything else,
/// including a missing key, falls back to the default interval.
fn settings_from_value(value: &Value) -> WatchSettings {
    let interval = match value.get("interval") {
        Some(Value::String(spec)) => spec.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => WatchSettings::default().interval,
    };
    let notification_mode =
        NotificationMode::from_config(value.get("notification_mode").and_then(Value::as_str));

    WatchSettings {
        interval,
        notification_mode,
    }
}

/// Non-empty string or number field as text
fn text_field(value: &Value, key: &str) -> Option<String> {
    let text = match value.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn credentials_from_value(value: &Value) -> Option<TelegramCredentials> {
    Some(TelegramCredentials {
        token: text_field(value, "telegram_token")?,
        chat_id: text_field(value, "telegram_chat_id")?,
    })
}

/// Keep well-formed products with a positive target, in stored order
fn products_from_entries(path: &Path, entries: Vec<Value>) -> Vec<Product> {
    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<Product>(entry) {
            Ok(product) if product.target_price == 0 => {
                warn!(
                    path = %path.display(),
                    index,
                    url = %product.url,
                    "Skipping product with zero target price"
                );
                None
            }
            Ok(product) => Some(product),
            Err(e) => {
                warn!(path = %path.display(), index, error = %e, "Skipping malformed product");
                None
            }
        })
        .collect()
}

#[async_trait]
impl CatalogStore for JsonFileCatalog {
    async fn load_products(&self) -> Result<Vec<Product>> {
        let Some(contents) = read_optional(&self.products_path).await? else {
            debug!(path = %self.products_path.display(), "Products file missing, treating as empty");
            return Ok(Vec::new());
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        let entries: Vec<Value> = serde_json::from_str(&contents)
            .map_err(|e| Error::store_file(&self.products_path, e))?;
        Ok(products_from_entries(&self.products_path, entries))
    }

    async fn load_settings(&self) -> Result<WatchSettings> {
        Ok(self
            .read_settings()
            .await?
            .map(|value| settings_from_value(&value))
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_interval_forms() {
        let settings = settings_from_value(&json!({"interval": "random:2m-5m"}));
        assert_eq!(settings.interval, "random:2m-5m");

        let settings = settings_from_value(&json!({"interval": 300}));
        assert_eq!(settings.interval, "300");

        let settings = settings_from_value(&json!({"interval": null}));
        assert_eq!(settings.interval, "60");

        let settings = settings_from_value(&json!({}));
        assert_eq!(settings.interval, "60");
    }

    #[test]
    fn test_settings_notification_mode() {
        let settings = settings_from_value(&json!({"notification_mode": "both"}));
        assert_eq!(settings.notification_mode, NotificationMode::Both);

        let settings = settings_from_value(&json!({"notification_mode": 3}));
        assert_eq!(settings.notification_mode, NotificationMode::BelowTarget);

        let settings = settings_from_value(&json!({"theme": "dark"}));
        assert_eq!(settings.notification_mode, NotificationMode::BelowTarget);
    }

    #[test]
    fn test_bad_product_records_are_skipped() {
        let entries = vec![
            json!({"url": "https://a", "target_price": 100, "name": null}),
            json!({"url": "https://free", "target_price": 0}),
            json!({"url": "https://negative", "target_price": -5}),
            json!({"target_price": 10}),
            json!("https://not-an-object"),
            json!({"url": "https://b", "target_price": 20, "name": "Bike"}),
        ];

        let products = products_from_entries(Path::new("products.json"), entries);
        assert_eq!(
            products,
            vec![
                Product::new("https://a", 100),
                Product::new("https://b", 20).with_name("Bike"),
            ]
        );
    }

    #[test]
    fn test_telegram_credentials_from_settings() {
        let value = json!({"telegram_token": "123:abc", "telegram_chat_id": "-1001"});
        assert_eq!(
            credentials_from_value(&value),
            Some(TelegramCredentials {
                token: "123:abc".to_string(),
                chat_id: "-1001".to_string(),
            })
        );

        let value = json!({"telegram_token": "123:abc", "telegram_chat_id": 4242});
        assert_eq!(credentials_from_value(&value).unwrap().chat_id, "4242");

        // empty strings mean Telegram is not set up
        let value = json!({"telegram_token": "", "telegram_chat_id": ""});
        assert_eq!(credentials_from_value(&value), None);

        let value = json!({"telegram_token": "123:abc"});
        assert_eq!(credentials_from_value(&value), None);
    }
}
