//! Sync channel configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::domain::Backoff;

/// Retry schedule for remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts per call, the first one included.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    /// Delays to sleep between attempts.
    #[must_use]
    pub const fn delays(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.base_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.max_attempts.saturating_sub(1),
        )
    }
}

/// Tuning for the five update channels.
///
/// # Examples
///
/// ```
/// use scrollback::sync::config::SyncConfig;
///
/// let config: SyncConfig = serde_json::from_str(r#"{ "resume_window": 80 }"#).unwrap();
/// assert_eq!(config.resume_window, 80);
/// assert_eq!(config.periodic_chat_limit, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Interval of the adaptive poll while it is active.
    pub poll_interval_ms: u64,
    /// Realtime silence after which the adaptive poll kicks in.
    pub quiet_threshold_ms: u64,
    /// Messages fetched for the active conversation on foreground resume.
    pub resume_window: u64,
    /// Interval of the background sweep.
    pub periodic_interval_ms: u64,
    /// Most recently active chats visited by each sweep.
    pub periodic_chat_limit: usize,
    /// Messages fetched per chat by each sweep.
    pub periodic_message_cap: u64,
    /// Retry schedule shared by every channel.
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 3_000,
            quiet_threshold_ms: 20_000,
            resume_window: 50,
            periodic_interval_ms: 300_000,
            periodic_chat_limit: 10,
            periodic_message_cap: 25,
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Returns the adaptive poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the realtime quiet threshold.
    #[must_use]
    pub const fn quiet_threshold(&self) -> Duration {
        Duration::from_millis(self.quiet_threshold_ms)
    }

    /// Returns the background sweep interval.
    #[must_use]
    pub const fn periodic_interval(&self) -> Duration {
        Duration::from_millis(self.periodic_interval_ms)
    }
}
