//! Notification decisions.
//!
//! [`decide`] is a pure function over the previous observation, the current
//! price, the product target and the configured [`NotificationMode`].

use crate::types::NotificationMode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of alert message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// The price differs from the previous observation
    PriceChange,
    /// The price is below the product target
    PriceDrop,
}

impl AlertKind {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::PriceChange => "price_change",
            AlertKind::PriceDrop => "price_drop",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide whether a price observation warrants an alert.
///
/// Returns `None` when nothing should be sent. In [`NotificationMode::Both`]
/// a change takes precedence over a drop, so at most one alert is produced.
pub fn decide(
    previous: Option<u64>,
    current: u64,
    target: u64,
    mode: NotificationMode,
) -> Option<AlertKind> {
    let changed = previous.is_some_and(|prev| prev != current);
    let below_target = current < target;

    match mode {
        NotificationMode::None => None,
        NotificationMode::BelowTarget => below_target.then_some(AlertKind::PriceDrop),
        NotificationMode::AnyChange => changed.then_some(AlertKind::PriceChange),
        NotificationMode::Both => {
            if changed {
                Some(AlertKind::PriceChange)
            } else {
                below_target.then_some(AlertKind::PriceDrop)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use NotificationMode::*;

    #[test]
    fn test_decision_table() {
        let cases: &[(Option<u64>, u64, u64, NotificationMode, Option<AlertKind>)] = &[
            (Option::None, 100, 100, BelowTarget, Option::None),
            (Some(100), 90, 100, AnyChange, Some(AlertKind::PriceChange)),
            (Some(100), 90, 100, Both, Some(AlertKind::PriceChange)),
            (Option::None, 90, 100, BelowTarget, Some(AlertKind::PriceDrop)),
            (Some(100), 100, 100, AnyChange, Option::None),
            (Option::None, 90, 100, AnyChange, Option::None),
            (Option::None, 90, 100, Both, Some(AlertKind::PriceDrop)),
            (Some(90), 90, 100, Both, Some(AlertKind::PriceDrop)),
            (Some(90), 120, 100, Both, Some(AlertKind::PriceChange)),
            (Some(120), 120, 100, Both, Option::None),
            (Some(120), 110, 100, BelowTarget, Option::None),
            (Some(100), 99, 100, BelowTarget, Some(AlertKind::PriceDrop)),
        ];

        for &(previous, current, target, mode, expected) in cases {
            assert_eq!(
                decide(previous, current, target, mode),
                expected,
                "previous={previous:?} current={current} target={target} mode={mode}"
            );
        }
    }

    #[test]
    fn test_equal_to_target_does_not_notify() {
        assert_eq!(decide(Some(150), 100, 100, BelowTarget), Option::None);
    }

    #[test]
    fn test_properties_over_input_domain() {
        let prices = [0u64, 1, 50, 99, 100, 101, 1_000];
        let previous: Vec<Option<u64>> =
            std::iter::once(Option::None).chain(prices.iter().copied().map(Some)).collect();

        for &prev in &previous {
            for &current in &prices {
                for &target in &prices[1..] {
                    assert_eq!(decide(prev, current, target, None), Option::None);

                    let change = decide(prev, current, target, AnyChange);
                    let drop = decide(prev, current, target, BelowTarget);
                    assert_eq!(decide(prev, current, target, Both), change.or(drop));

                    // first sighting only seeds history
                    if prev.is_none() {
                        assert_eq!(change, Option::None);
                    }
                }
            }
        }
    }

    #[test]
    fn test_alert_kind_labels() {
        assert_eq!(AlertKind::PriceChange.to_string(), "price_change");
        assert_eq!(AlertKind::PriceDrop.as_str(), "price_drop");
    }
}
