//! Mapping between local row offsets and declared positions.
//!
//! The declared size counts messages the remote reported but the mirror
//! does not hold yet. Those missing messages occupy positions of their own,
//! so a stored row's position is its local offset plus the length of every
//! hole that sorts before it.

use super::PositionRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hole {
    /// Local offset of the first stored row after the hole.
    boundary: u64,
    len: u64,
}

/// Holes in a conversation's local rows, in position order.
///
/// # Examples
///
/// ```
/// use scrollback::paging::domain::{PositionLayout, PositionRange};
///
/// // Ten stored rows, then five missing, then the rest.
/// let layout = PositionLayout::new([(10, 5)]);
///
/// assert_eq!(layout.position_of(9), 9);
/// assert_eq!(layout.position_of(10), 15);
/// assert_eq!(layout.local_at(12), None);
/// assert_eq!(layout.local_at_or_after(12), 10);
/// assert_eq!(layout.holes().collect::<Vec<_>>(), vec![PositionRange::new(10, 15)]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionLayout {
    holes: Vec<Hole>,
}

impl PositionLayout {
    /// A layout without holes: positions equal local offsets.
    #[must_use]
    pub const fn contiguous() -> Self {
        Self { holes: Vec::new() }
    }

    /// Builds a layout from `(boundary, len)` pairs, where `boundary` is the
    /// local offset of the first stored row after a hole of `len` missing
    /// messages. Holes sharing a boundary are combined.
    #[must_use]
    pub fn new(holes: impl IntoIterator<Item = (u64, u64)>) -> Self {
        let mut sorted: Vec<Hole> = holes
            .into_iter()
            .filter(|(_, len)| *len > 0)
            .map(|(boundary, len)| Hole { boundary, len })
            .collect();
        sorted.sort_by_key(|hole| hole.boundary);
        let mut merged: Vec<Hole> = Vec::with_capacity(sorted.len());
        for hole in sorted {
            match merged.last_mut() {
                Some(last) if last.boundary == hole.boundary => {
                    last.len = last.len.saturating_add(hole.len);
                }
                _ => merged.push(hole),
            }
        }
        Self { holes: merged }
    }

    /// Returns `true` when no hole is known.
    #[must_use]
    pub fn is_contiguous(&self) -> bool {
        self.holes.is_empty()
    }

    /// Declared position of the stored row at local offset `local`.
    #[must_use]
    pub fn position_of(&self, local: u64) -> u64 {
        self.holes
            .iter()
            .take_while(|hole| hole.boundary <= local)
            .fold(local, |position, hole| position.saturating_add(hole.len))
    }

    /// Local offset of the stored row at `position`, or `None` when the
    /// position lies in a hole.
    #[must_use]
    pub fn local_at(&self, position: u64) -> Option<u64> {
        match self.locate(position) {
            Located::Stored(local) => Some(local),
            Located::Missing(_) => None,
        }
    }

    /// Local offset of the first stored row at or after `position`.
    #[must_use]
    pub fn local_at_or_after(&self, position: u64) -> u64 {
        match self.locate(position) {
            Located::Stored(local) | Located::Missing(local) => local,
        }
    }

    /// Declared position ranges of the holes.
    pub fn holes(&self) -> impl Iterator<Item = PositionRange> + '_ {
        self.holes.iter().scan(0_u64, |shift, hole| {
            let start = hole.boundary.saturating_add(*shift);
            *shift = shift.saturating_add(hole.len);
            Some(PositionRange::with_len(start, hole.len))
        })
    }

    fn locate(&self, position: u64) -> Located {
        let mut shift = 0_u64;
        for hole in &self.holes {
            let start = hole.boundary.saturating_add(shift);
            if position < start {
                break;
            }
            if position < start.saturating_add(hole.len) {
                return Located::Missing(hole.boundary);
            }
            shift = shift.saturating_add(hole.len);
        }
        Located::Stored(position.saturating_sub(shift))
    }
}

enum Located {
    Stored(u64),
    /// Inside a hole; carries the local offset of the row after it.
    Missing(u64),
}
