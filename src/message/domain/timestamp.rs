//! Millisecond timestamps on the single ordering axis.

use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Milliseconds since the Unix epoch.
///
/// Every message, sync range and summary shares this one time axis; unified
/// conversations interleave their member chats on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The earliest representable instant; used as an open lower bound.
    pub const MIN: Self = Self(i64::MIN);

    /// The latest representable instant; used as an open upper bound.
    pub const MAX: Self = Self(i64::MAX);

    /// Creates a timestamp from epoch milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the epoch milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Converts a UTC date-time.
    #[must_use]
    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        Self(value.timestamp_millis())
    }

    /// Reads the current instant from a clock.
    #[must_use]
    pub fn now(clock: &impl Clock) -> Self {
        Self::from_datetime(clock.utc())
    }

    /// Converts back to a UTC date-time, if representable.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}
