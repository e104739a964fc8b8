//! Exponential backoff schedule.

use std::time::Duration;

/// Doubling delays, capped, for a bounded number of retries.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use scrollback::sync::domain::Backoff;
///
/// let delays: Vec<Duration> =
///     Backoff::new(Duration::from_millis(100), Duration::from_millis(250), 4).collect();
/// assert_eq!(
///     delays,
///     vec![
///         Duration::from_millis(100),
///         Duration::from_millis(200),
///         Duration::from_millis(250),
///         Duration::from_millis(250),
///     ]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    remaining: u32,
}

impl Backoff {
    /// Creates a schedule of `retries` delays starting at `base`.
    #[must_use]
    pub const fn new(base: Duration, max: Duration, retries: u32) -> Self {
        Self {
            next: base,
            max,
            remaining: retries,
        }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let delay = self.next.min(self.max);
        self.next = self.next.saturating_mul(2);
        Some(delay)
    }
}
