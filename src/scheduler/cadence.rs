//! Refresh cadence bookkeeping.
//!
//! Reports how long ago the queue was last refreshed against a configured
//! threshold. Whether to refresh again is the caller's decision.

use chrono::{DateTime, Utc};

/// Default minimum interval between refreshes, in minutes.
pub const DEFAULT_REFRESH_THRESHOLD_MINUTES: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshCadence {
    threshold_minutes: f64,
    last_refreshed_at: Option<DateTime<Utc>>,
}

impl RefreshCadence {
    pub fn new(threshold_minutes: f64) -> Self {
        Self {
            threshold_minutes,
            last_refreshed_at: None,
        }
    }

    pub fn threshold_minutes(&self) -> f64 {
        self.threshold_minutes
    }

    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed_at
    }

    pub fn record_refresh(&mut self, at: DateTime<Utc>) {
        self.last_refreshed_at = Some(at);
    }

    /// Minutes since the last successful refresh, `None` if never refreshed.
    pub fn minutes_since_last_refresh(&self, now: DateTime<Utc>) -> Option<f64> {
        self.last_refreshed_at
            .map(|at| (now - at).num_milliseconds() as f64 / 60_000.0)
    }

    /// Whether more than the threshold has elapsed. `false` if never refreshed.
    pub fn threshold_exceeded(&self, now: DateTime<Utc>) -> bool {
        self.minutes_since_last_refresh(now)
            .is_some_and(|minutes| minutes > self.threshold_minutes)
    }
}

impl Default for RefreshCadence {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_THRESHOLD_MINUTES)
    }
}
