//! The sparse positional window published to the rendering layer.
//!
//! A window declares the conversation's total size and maps a subset of
//! positions to hydrated items. Positions below the total that are not
//! loaded are holes: the renderer shows a placeholder for them. Windows are
//! rebuilt on every controller pass and never mutated after publication,
//! so they can be shared freely behind an [`Arc`].

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Generation, MessageView, PositionRange, range::ranges_of};

/// What a window holds at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot<'a> {
    /// The item is loaded.
    Loaded(&'a Arc<MessageView>),
    /// The position exists but is not loaded yet.
    Pending,
    /// The position is past the end of the conversation.
    OutOfBounds,
}

/// Total size plus a partial position → item mapping.
///
/// # Invariants
///
/// - every loaded position is `< total_size`
/// - `loaded_ranges` is exactly the set of loaded positions, as sorted,
///   disjoint, non-adjacent ranges
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SparseWindow {
    total_size: u64,
    generation: Generation,
    visible: PositionRange,
    loaded: BTreeMap<u64, Arc<MessageView>>,
    loaded_ranges: Vec<PositionRange>,
}

impl SparseWindow {
    /// A window for an empty conversation.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a window. Entries at or beyond `total_size` are dropped.
    #[must_use]
    pub fn build(
        total_size: u64,
        generation: Generation,
        visible: PositionRange,
        entries: impl IntoIterator<Item = (u64, Arc<MessageView>)>,
    ) -> Self {
        let loaded: BTreeMap<u64, Arc<MessageView>> = entries
            .into_iter()
            .filter(|(position, _)| *position < total_size)
            .collect();
        let loaded_ranges = ranges_of(loaded.keys().copied());
        Self {
            total_size,
            generation,
            visible: visible.clamp(total_size),
            loaded,
            loaded_ranges,
        }
    }

    /// Declared number of positions.
    #[must_use]
    pub const fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Generation the window was built for.
    #[must_use]
    pub const fn generation(&self) -> Generation {
        self.generation
    }

    /// The visible range the window was built around.
    #[must_use]
    pub const fn visible(&self) -> PositionRange {
        self.visible
    }

    /// Returns what the window holds at `position`.
    #[must_use]
    pub fn get(&self, position: u64) -> Slot<'_> {
        if position >= self.total_size {
            return Slot::OutOfBounds;
        }
        self.loaded
            .get(&position)
            .map_or(Slot::Pending, Slot::Loaded)
    }

    /// Returns `true` if `position` holds a loaded item.
    #[must_use]
    pub fn is_loaded(&self, position: u64) -> bool {
        self.loaded.contains_key(&position)
    }

    /// Contiguous loaded ranges, sorted.
    #[must_use]
    pub fn loaded_ranges(&self) -> &[PositionRange] {
        &self.loaded_ranges
    }

    /// Number of loaded positions.
    #[must_use]
    pub fn loaded_len(&self) -> usize {
        self.loaded.len()
    }

    /// Iterates loaded items in position order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &Arc<MessageView>)> {
        self.loaded.iter().map(|(position, view)| (*position, view))
    }

    /// Iterates loaded items inside `range`.
    pub fn within(&self, range: PositionRange) -> impl Iterator<Item = (u64, &Arc<MessageView>)> {
        self.loaded
            .range(range.start()..range.end())
            .map(|(position, view)| (*position, view))
    }
}
