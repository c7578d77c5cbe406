//! Telegram delivery for price alerts.

use crate::store::JsonFileCatalog;
use crate::types::TelegramCredentials;
use async_trait::async_trait;
use pricewatch::{AlertDispatcher, DispatchError};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Sends alert text through the Telegram Bot API
///
/// Credentials in the settings file are re-read on every send and win over the
/// ones given at construction. Without credentials every send is a successful
/// no-op, so the watcher keeps running and alerts only show up in the logs.
pub struct TelegramNotifier {
    client: reqwest::Client,
    credentials: Option<TelegramCredentials>,
    settings: Option<JsonFileCatalog>,
    api_base: String,
}

impl TelegramNotifier {
    /// Create a notifier against the public Bot API
    pub fn new(
        credentials: Option<TelegramCredentials>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Self::with_api_base(credentials, timeout, TELEGRAM_API)
    }

    /// Create a notifier against a custom Bot API host
    pub fn with_api_base(
        credentials: Option<TelegramCredentials>,
        timeout: Duration,
        api_base: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let api_base: String = api_base.into();
        Ok(Self {
            client,
            credentials,
            settings: None,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Look up `telegram_token` / `telegram_chat_id` in the catalog's settings file per send
    pub fn with_settings_source(mut self, catalog: JsonFileCatalog) -> Self {
        self.settings = Some(catalog);
        self
    }

    /// Whether fallback credentials were given at construction
    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Credentials for the next send
    async fn current_credentials(&self) -> Option<TelegramCredentials> {
        if let Some(ref catalog) = self.settings {
            match catalog.load_telegram_credentials().await {
                Ok(Some(credentials)) => return Some(credentials),
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "Could not read Telegram credentials, using configured ones");
                }
            }
        }
        self.credentials.clone()
    }
}

#[async_trait]
impl AlertDispatcher for TelegramNotifier {
    async fn send(&self, text: &str) -> Result<(), DispatchError> {
        let Some(credentials) = self.current_credentials().await else {
            debug!("Telegram not configured, dropping alert");
            return Ok(());
        };

        let url = format!("{}/bot{}/sendMessage", self.api_base, credentials.token);
        let response = self
            .client
            .post(&url)
            .json(&SendMessage {
                chat_id: &credentials.chat_id,
                text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(chat_id = %credentials.chat_id, "Telegram message sent");
        Ok(())
    }
}
