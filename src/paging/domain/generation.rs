//! Generation tokens that invalidate in-flight loads.

use std::fmt;

/// Monotonic counter owned by the paging controller.
///
/// Every load is tagged with the generation current when it was issued; a
/// result whose tag no longer matches is discarded.
///
/// # Examples
///
/// ```
/// use scrollback::paging::domain::Generation;
///
/// let first = Generation::default();
/// let second = first.next();
/// assert!(second > first);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    /// Returns the following generation.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}
