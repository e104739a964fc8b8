//! The conversation sort key.
//!
//! Position `0` is the newest visible message. Messages are ordered by
//! creation timestamp descending, and by GUID descending when timestamps
//! collide, which gives a total order even for rapid batch sends.

use super::{Message, MessageGuid, Timestamp};
use std::cmp::Ordering;

/// Sort key `(created_at DESC, guid DESC)`.
///
/// The [`Ord`] implementation sorts *newest first*: a key that compares
/// `Less` than another comes earlier in the conversation list.
///
/// # Examples
///
/// ```
/// use scrollback::message::domain::{MessageGuid, SortKey, Timestamp};
///
/// let b = SortKey::new(Timestamp::from_millis(10), MessageGuid::new("b"));
/// let a = SortKey::new(Timestamp::from_millis(10), MessageGuid::new("a"));
/// assert!(b < a);
/// assert!(b.is_newer_than(&a));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    created_at: Timestamp,
    guid: MessageGuid,
}

impl SortKey {
    /// Creates a sort key.
    #[must_use]
    pub const fn new(created_at: Timestamp, guid: MessageGuid) -> Self {
        Self { created_at, guid }
    }

    /// Builds the key of a message.
    #[must_use]
    pub fn of(message: &Message) -> Self {
        Self::new(message.created_at(), message.guid().clone())
    }

    /// Returns the creation timestamp component.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Returns the GUID component.
    #[must_use]
    pub const fn guid(&self) -> &MessageGuid {
        &self.guid
    }

    /// Returns `true` if `self` sorts strictly before `other`.
    #[must_use]
    pub fn is_newer_than(&self, other: &Self) -> bool {
        self < other
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .created_at
            .cmp(&self.created_at)
            .then_with(|| other.guid.cmp(&self.guid))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
