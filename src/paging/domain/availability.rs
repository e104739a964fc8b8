//! Loading → unavailable bookkeeping for messages awaiting repair.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::message::domain::{MessageGuid, Timestamp};

/// What the renderer should show for a message that was asked for by GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// The message is present locally.
    Available,
    /// A repair is in progress.
    Loading {
        /// When the repair was requested.
        since: Timestamp,
    },
    /// The repair did not produce the message within the timeout.
    Unavailable,
}

/// GUIDs tracked before expired entries are pruned.
const TRACKED_LIMIT: usize = 1_024;

/// Tracks GUIDs whose repair has been requested.
///
/// At most `limit` GUIDs are held. Reaching the limit first drops GUIDs
/// already reported unavailable, then the longest-waiting ones; a dropped
/// GUID is asked for again the next time it is needed.
#[derive(Debug, Clone)]
pub struct AvailabilityTracker {
    timeout_ms: i64,
    limit: usize,
    pending: HashMap<MessageGuid, Timestamp>,
}

impl AvailabilityTracker {
    /// Creates a tracker with the given timeout.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self::with_limit(timeout, TRACKED_LIMIT)
    }

    /// Creates a tracker holding at most `limit` GUIDs.
    #[must_use]
    pub fn with_limit(timeout: Duration, limit: usize) -> Self {
        Self {
            timeout_ms: i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX),
            limit: limit.max(1),
            pending: HashMap::new(),
        }
    }

    /// Starts tracking `guid`. Returns `false` if it was already tracked.
    pub fn begin(&mut self, guid: &MessageGuid, now: Timestamp) -> bool {
        if self.pending.contains_key(guid) {
            return false;
        }
        if self.pending.len() >= self.limit {
            self.prune(now);
        }
        self.pending.insert(guid.clone(), now);
        true
    }

    /// Stops tracking `guid` because it arrived.
    pub fn resolve(&mut self, guid: &MessageGuid) {
        self.pending.remove(guid);
    }

    /// Returns the state of a tracked GUID, or `None` if it is not tracked.
    #[must_use]
    pub fn status(&self, guid: &MessageGuid, now: Timestamp) -> Option<Availability> {
        let since = *self.pending.get(guid)?;
        Some(if self.expired(since, now) {
            Availability::Unavailable
        } else {
            Availability::Loading { since }
        })
    }

    /// Number of tracked GUIDs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` when nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    const fn expired(&self, since: Timestamp, now: Timestamp) -> bool {
        now.as_millis().saturating_sub(since.as_millis()) >= self.timeout_ms
    }

    /// Makes room for one more GUID.
    fn prune(&mut self, now: Timestamp) {
        let timeout_ms = self.timeout_ms;
        self.pending
            .retain(|_, since| now.as_millis().saturating_sub(since.as_millis()) < timeout_ms);
        let excess = self.pending.len().saturating_add(1).saturating_sub(self.limit);
        if excess == 0 {
            return;
        }
        let mut oldest: Vec<(Timestamp, MessageGuid)> = self
            .pending
            .iter()
            .map(|(guid, since)| (*since, guid.clone()))
            .collect();
        oldest.sort();
        for (_, guid) in oldest.into_iter().take(excess) {
            self.pending.remove(&guid);
        }
        debug!(dropped = excess, "availability tracker full; dropped oldest entries");
    }
}
