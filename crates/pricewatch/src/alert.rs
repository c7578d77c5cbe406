//! Alert messages and the dispatcher seam.

use crate::decision::AlertKind;
use async_trait::async_trait;

/// Delivery failure reported by a dispatcher
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Message rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Best-effort delivery of operator messages
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    /// Send a text message
    async fn send(&self, text: &str) -> Result<(), DispatchError>;
}

/// Dispatcher that drops every message, for hosts without a messaging channel
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDispatcher;

#[async_trait]
impl AlertDispatcher for NullDispatcher {
    async fn send(&self, _text: &str) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// A price alert about one product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub name: String,
    pub url: String,
    pub previous: Option<u64>,
    pub price: u64,
    pub target: u64,
}

impl Alert {
    /// Render the operator-facing message
    pub fn message(&self) -> String {
        match (self.kind, self.previous) {
            (AlertKind::PriceChange, Some(previous)) => format!(
                "PRICE CHANGE: {} changed from {} € to {} € (target {} €)\n{}",
                self.name, previous, self.price, self.target, self.url
            ),
            (AlertKind::PriceChange, None) => format!(
                "PRICE CHANGE: {} is now {} € (target {} €)\n{}",
                self.name, self.price, self.target, self.url
            ),
            (AlertKind::PriceDrop, _) => format!(
                "PRICE ALERT: {} has dropped to {} € (below your target of {} €)!\n{}",
                self.name, self.price, self.target, self.url
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(kind: AlertKind, previous: Option<u64>) -> Alert {
        Alert {
            kind,
            name: "Road Bike".to_string(),
            url: "https://shop.example/bike".to_string(),
            previous,
            price: 900,
            target: 1000,
        }
    }

    #[test]
    fn test_drop_message() {
        assert_eq!(
            alert(AlertKind::PriceDrop, None).message(),
            "PRICE ALERT: Road Bike has dropped to 900 € (below your target of 1000 €)!\nhttps://shop.example/bike"
        );
    }

    #[test]
    fn test_change_message() {
        assert_eq!(
            alert(AlertKind::PriceChange, Some(950)).message(),
            "PRICE CHANGE: Road Bike changed from 950 € to 900 € (target 1000 €)\nhttps://shop.example/bike"
        );
    }

    #[tokio::test]
    async fn test_null_dispatcher_accepts_everything() {
        tokio_test::assert_ok!(NullDispatcher.send("hello").await);
    }
}
