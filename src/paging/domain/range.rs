//! Half-open position ranges.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Positions `[start, end)`.
///
/// # Examples
///
/// ```
/// use scrollback::paging::domain::PositionRange;
///
/// let visible = PositionRange::new(100, 150);
/// let materialise = visible.expand(25).clamp(160);
/// assert_eq!(materialise, PositionRange::new(75, 160));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PositionRange {
    start: u64,
    end: u64,
}

impl PositionRange {
    /// Creates a range; a reversed range is treated as empty at `start`.
    #[must_use]
    pub const fn new(start: u64, end: u64) -> Self {
        if end < start {
            Self { start, end: start }
        } else {
            Self { start, end }
        }
    }

    /// Creates a range from a start and a length.
    #[must_use]
    pub const fn with_len(start: u64, len: u64) -> Self {
        Self::new(start, start.saturating_add(len))
    }

    /// An empty range at zero.
    #[must_use]
    pub const fn empty() -> Self {
        Self { start: 0, end: 0 }
    }

    /// First position.
    #[must_use]
    pub const fn start(self) -> u64 {
        self.start
    }

    /// One past the last position.
    #[must_use]
    pub const fn end(self) -> u64 {
        self.end
    }

    /// Number of positions.
    #[must_use]
    pub const fn len(self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Returns `true` if the range holds no positions.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.end <= self.start
    }

    /// Returns `true` if `position` lies in the range.
    #[must_use]
    pub const fn contains(self, position: u64) -> bool {
        self.start <= position && position < self.end
    }

    /// Grows the range by `by` on both ends, saturating at zero.
    #[must_use]
    pub const fn expand(self, by: u64) -> Self {
        Self::new(self.start.saturating_sub(by), self.end.saturating_add(by))
    }

    /// Clamps the range to `[0, total)`.
    #[must_use]
    pub const fn clamp(self, total: u64) -> Self {
        let end = if self.end < total { self.end } else { total };
        let start = if self.start < end { self.start } else { end };
        Self { start, end }
    }

    /// Returns a range of the same length centred on `position`, clamped to
    /// `[0, total)`.
    #[must_use]
    pub fn centred_on(position: u64, len: u64, total: u64) -> Self {
        let before = len.checked_div(2).unwrap_or_default();
        let start = position
            .saturating_sub(before)
            .min(total.saturating_sub(len));
        Self::with_len(start, len).clamp(total)
    }

    /// Returns the overlap of two ranges.
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        Self::new(start, end)
    }

    /// Returns the parts of `self` not covered by any of `covered`.
    ///
    /// `covered` must be sorted by start and non-overlapping.
    #[must_use]
    pub fn subtract(self, covered: &[Self]) -> Vec<Self> {
        let mut missing = Vec::new();
        let mut cursor = self.start;
        for range in covered {
            if range.end <= cursor {
                continue;
            }
            if range.start >= self.end {
                break;
            }
            if range.start > cursor {
                missing.push(Self::new(cursor, range.start));
            }
            cursor = cursor.max(range.end);
        }
        if cursor < self.end {
            missing.push(Self::new(cursor, self.end));
        }
        missing
    }

    /// Iterates the positions in the range.
    pub fn positions(self) -> impl Iterator<Item = u64> {
        self.start..self.end
    }
}

impl fmt::Display for PositionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Collapses sorted positions into contiguous ranges.
pub(crate) fn ranges_of(positions: impl IntoIterator<Item = u64>) -> Vec<PositionRange> {
    let mut ranges: Vec<PositionRange> = Vec::new();
    for position in positions {
        match ranges.last_mut() {
            Some(last) if last.end == position => last.end = position.saturating_add(1),
            _ => ranges.push(PositionRange::with_len(position, 1)),
        }
    }
    ranges
}

/// Merges possibly overlapping ranges into a sorted, disjoint list.
pub(crate) fn union_of(mut ranges: Vec<PositionRange>) -> Vec<PositionRange> {
    ranges.retain(|range| !range.is_empty());
    ranges.sort_by_key(|range| range.start);
    let mut merged: Vec<PositionRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}
