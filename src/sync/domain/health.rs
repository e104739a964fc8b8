//! Realtime channel liveness.

use std::time::Duration;

use crate::message::domain::Timestamp;

/// Tracks when the realtime channel last delivered anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RealtimeHealth {
    last_activity: Timestamp,
    quiet_threshold_ms: i64,
}

impl RealtimeHealth {
    /// Starts tracking as of `now`.
    #[must_use]
    pub fn new(now: Timestamp, quiet_threshold: Duration) -> Self {
        Self {
            last_activity: now,
            quiet_threshold_ms: i64::try_from(quiet_threshold.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Records activity at `now`.
    pub const fn record(&mut self, now: Timestamp) {
        self.last_activity = now;
    }

    /// Returns when the channel was last active.
    #[must_use]
    pub const fn last_activity(&self) -> Timestamp {
        self.last_activity
    }

    /// Returns `true` once the channel has been quiet for the threshold.
    #[must_use]
    pub const fn is_silent(&self, now: Timestamp) -> bool {
        now.as_millis().saturating_sub(self.last_activity.as_millis()) >= self.quiet_threshold_ms
    }
}
