//! Price watch types and structures.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Interval used when the configuration does not name one.
pub const DEFAULT_INTERVAL_SPEC: &str = "60";

/// A monitored product page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product page URL (unique key)
    pub url: String,

    /// Alert when the price falls below this value
    pub target_price: u64,

    /// Display name, may be empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Product {
    /// Create a product without a display name
    pub fn new(url: impl Into<String>, target_price: u64) -> Self {
        Self {
            url: url.into(),
            target_price,
            name: String::new(),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Name used in logs before anything has been fetched
    pub fn label(&self) -> &str {
        if self.name.is_empty() { &self.url } else { &self.name }
    }
}

/// One successful price lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceObservation {
    /// Observed price in whole currency units
    pub price: u64,

    /// Name reported by the product page
    pub name: String,
}

/// Policy governing which price transitions trigger an alert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationMode {
    /// Alert whenever the price differs from the previous observation
    AnyChange,
    /// Alert whenever the price is strictly below the target
    #[default]
    BelowTarget,
    /// Change alerts first, drop alerts otherwise
    Both,
    /// Never alert
    None,
}

impl NotificationMode {
    /// Interpret a configured mode, treating unknown or missing values as `BelowTarget`
    pub fn from_config(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("any_change") => NotificationMode::AnyChange,
            Some("below_target") => NotificationMode::BelowTarget,
            Some("both") => NotificationMode::Both,
            Some("none") => NotificationMode::None,
            _ => NotificationMode::BelowTarget,
        }
    }

    /// Configuration spelling of the mode
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationMode::AnyChange => "any_change",
            NotificationMode::BelowTarget => "below_target",
            NotificationMode::Both => "both",
            NotificationMode::None => "none",
        }
    }
}

impl fmt::Display for NotificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings re-read at the start of every cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    /// Interval specification, see [`crate::interval`]
    pub interval: String,

    /// Alert policy
    pub notification_mode: NotificationMode,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL_SPEC.to_string(),
            notification_mode: NotificationMode::default(),
        }
    }
}

/// Lifecycle phase of the watcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// No worker task is running
    Stopped,
    /// The poll loop is running
    Running,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Stopped => write!(f, "Stopped"),
            Phase::Running => write!(f, "Running"),
        }
    }
}

/// Next-check schedule published by the poll loop once per cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Resolved interval in seconds
    pub interval_secs: u64,

    /// Wall-clock time of the next cycle
    pub next_check: SystemTime,

    /// Monotonic deadline of the next cycle, used for the countdown
    pub deadline: tokio::time::Instant,
}

impl Schedule {
    /// Schedule a check `interval_secs` from now
    pub fn starting_now(interval_secs: u64) -> Self {
        let interval = Duration::from_secs(interval_secs);
        Self {
            interval_secs,
            next_check: SystemTime::now() + interval,
            deadline: tokio::time::Instant::now() + interval,
        }
    }

    /// Whole seconds until the next check, clamped at zero
    pub fn countdown_secs(&self) -> u64 {
        self.deadline
            .saturating_duration_since(tokio::time::Instant::now())
            .as_secs()
    }
}

/// Status report returned to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatcherStatus {
    /// Whether the watcher is running
    pub is_running: bool,

    /// "Running" or "Stopped"
    pub status: Phase,

    /// Seconds until the next check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<u64>,

    /// Unix timestamp (seconds) of the next check
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_check: Option<f64>,

    /// Current interval in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
}

impl WatcherStatus {
    /// Status of a stopped watcher
    pub fn stopped() -> Self {
        Self {
            is_running: false,
            status: Phase::Stopped,
            countdown: None,
            next_check: None,
            interval: None,
        }
    }

    /// Status of a running watcher, with the schedule if a cycle has published one
    pub fn running(schedule: Option<Schedule>) -> Self {
        Self {
            is_running: true,
            status: Phase::Running,
            countdown: schedule.map(|s| s.countdown_secs()),
            next_check: schedule.map(|s| unix_seconds(s.next_check)),
            interval: schedule.map(|s| s.interval_secs),
        }
    }
}

fn unix_seconds(time: SystemTime) -> f64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
