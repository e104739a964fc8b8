//! Time intervals confirmed complete against the remote store.
//!
//! A [`SyncRange`] says "every message of this chat created in
//! `[start, end]` is present locally". Ranges are only ever added, except
//! when a repair explicitly invalidates them. [`SyncCoverage`] merges a set
//! of ranges into disjoint per-chat intervals for fast membership tests.

use super::{ChatId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The channel that produced a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncChannel {
    /// Persistent live connection.
    Realtime,
    /// Out-of-band wake signal.
    BackupPush,
    /// Adaptive short-interval poll.
    Poll,
    /// Resume-on-foreground fetch.
    Resume,
    /// Periodic background sweep.
    Periodic,
    /// Targeted gap or message repair.
    Repair,
}

impl SyncChannel {
    /// Returns the storage code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Realtime => "realtime",
            Self::BackupPush => "backup_push",
            Self::Poll => "poll",
            Self::Resume => "resume",
            Self::Periodic => "periodic",
            Self::Repair => "repair",
        }
    }

    /// Parses a storage code.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "realtime" => Some(Self::Realtime),
            "backup_push" => Some(Self::BackupPush),
            "poll" => Some(Self::Poll),
            "resume" => Some(Self::Resume),
            "periodic" => Some(Self::Periodic),
            "repair" => Some(Self::Repair),
            _ => None,
        }
    }
}

impl fmt::Display for SyncChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time interval of one chat confirmed complete from the remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncRange {
    /// Chat the range belongs to.
    pub chat_id: ChatId,
    /// Oldest covered instant, inclusive.
    pub start: Timestamp,
    /// Newest covered instant, inclusive.
    pub end: Timestamp,
    /// When the range was confirmed.
    pub synced_at: Timestamp,
    /// Channel that confirmed it.
    pub source: SyncChannel,
}

impl SyncRange {
    /// Creates a range, swapping the bounds if they are reversed.
    #[must_use]
    pub fn new(
        chat_id: ChatId,
        start: Timestamp,
        end: Timestamp,
        synced_at: Timestamp,
        source: SyncChannel,
    ) -> Self {
        Self {
            chat_id,
            start: start.min(end),
            end: start.max(end),
            synced_at,
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Interval {
    start: Timestamp,
    end: Timestamp,
}

/// Disjoint synced intervals per chat.
///
/// # Examples
///
/// ```
/// use scrollback::message::domain::{ChatId, SyncChannel, SyncCoverage, SyncRange, Timestamp};
///
/// let chat = ChatId::new("c");
/// let at = Timestamp::from_millis;
/// let ranges = [
///     SyncRange::new(chat.clone(), at(90), at(100), at(0), SyncChannel::Realtime),
///     SyncRange::new(chat.clone(), at(10), at(20), at(0), SyncChannel::Periodic),
/// ];
/// let coverage = SyncCoverage::from_ranges(&ranges);
///
/// assert!(coverage.covers(&chat, at(12), at(18)));
/// assert!(!coverage.covers(&chat, at(12), at(95)));
/// assert_eq!(coverage.newest_gap_floor(&chat), Some(at(20)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncCoverage {
    intervals: BTreeMap<ChatId, Vec<Interval>>,
}

impl SyncCoverage {
    /// Merges ranges into disjoint intervals.
    ///
    /// Overlapping or touching ranges of the same chat collapse into one
    /// interval.
    #[must_use]
    pub fn from_ranges<'a>(ranges: impl IntoIterator<Item = &'a SyncRange>) -> Self {
        let mut grouped: BTreeMap<ChatId, Vec<Interval>> = BTreeMap::new();
        for range in ranges {
            grouped.entry(range.chat_id.clone()).or_default().push(Interval {
                start: range.start,
                end: range.end,
            });
        }
        let intervals = grouped
            .into_iter()
            .map(|(chat, raw)| (chat, merge_intervals(raw)))
            .collect();
        Self { intervals }
    }

    /// Returns `true` when no chat has a synced interval.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Returns the number of disjoint intervals recorded for a chat.
    #[must_use]
    pub fn interval_count(&self, chat: &ChatId) -> usize {
        self.intervals.get(chat).map_or(0, Vec::len)
    }

    /// Returns the index of the interval of `chat` containing `at`.
    #[must_use]
    pub fn interval_of(&self, chat: &ChatId, at: Timestamp) -> Option<usize> {
        let intervals = self.intervals.get(chat)?;
        let index = intervals.partition_point(|interval| interval.end < at);
        intervals
            .get(index)
            .filter(|interval| interval.start <= at)
            .map(|_| index)
    }

    /// Returns `true` if a single interval of `chat` covers `[start, end]`.
    #[must_use]
    pub fn covers(&self, chat: &ChatId, start: Timestamp, end: Timestamp) -> bool {
        match (self.interval_of(chat, start), self.interval_of(chat, end)) {
            (Some(low), Some(high)) => low == high,
            _ => false,
        }
    }

    /// Returns the newest synced instant older than the chat's newest
    /// unsynced gap, or `None` when the chat has fewer than two intervals.
    ///
    /// Messages missing from the mirror are taken to sit in that gap.
    #[must_use]
    pub fn newest_gap_floor(&self, chat: &ChatId) -> Option<Timestamp> {
        self.intervals
            .get(chat)?
            .iter()
            .rev()
            .nth(1)
            .map(|interval| interval.end)
    }
}

fn merge_intervals(mut raw: Vec<Interval>) -> Vec<Interval> {
    raw.sort_by_key(|interval| interval.start);
    let mut merged: Vec<Interval> = Vec::with_capacity(raw.len());
    for interval in raw {
        match merged.last_mut() {
            Some(last) if interval.start <= step_after(last.end) => {
                last.end = last.end.max(interval.end);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

const fn step_after(at: Timestamp) -> Timestamp {
    Timestamp::from_millis(at.as_millis().saturating_add(1))
}
