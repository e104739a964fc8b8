//! Identifier newtypes for messages, chats and unified conversations.
//!
//! GUIDs and chat identifiers are opaque strings assigned by the remote
//! store. Wrapping them keeps message and chat identifiers from being mixed
//! up at call sites.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Globally unique message identifier.
///
/// GUIDs are immutable and unique across every sync channel. Ordering is
/// plain byte-wise string ordering, which is the tie-break used when two
/// messages share a creation timestamp.
///
/// # Examples
///
/// ```
/// use scrollback::message::domain::MessageGuid;
///
/// let guid = MessageGuid::new("A1B2");
/// assert_eq!(guid.as_str(), "A1B2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageGuid(String);

impl MessageGuid {
    /// Wraps a remote-assigned GUID.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a GUID for a locally-authored message.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string().to_uppercase())
    }

    /// Returns the GUID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the identifier, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for MessageGuid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MessageGuid {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for MessageGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one channel-specific chat (for example the push-messaging
/// chat or the SMS chat with the same contact).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    /// Wraps a remote-assigned chat identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ChatId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The set of chat identifiers that make up one unified conversation.
///
/// Pagination always runs over the union of the member chats' messages, so
/// every query in the crate is parameterised by a `ChatSet` rather than a
/// single [`ChatId`].
///
/// # Examples
///
/// ```
/// use scrollback::message::domain::{ChatId, ChatSet};
///
/// let chats = ChatSet::from_iter([ChatId::new("imessage;-;+1555"), ChatId::new("sms;-;+1555")]);
/// assert_eq!(chats.len(), 2);
/// assert!(chats.contains(&ChatId::new("sms;-;+1555")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatSet(BTreeSet<ChatId>);

impl ChatSet {
    /// Creates a set holding a single chat.
    #[must_use]
    pub fn single(chat: ChatId) -> Self {
        Self(BTreeSet::from([chat]))
    }

    /// Returns `true` if the chat belongs to this conversation.
    #[must_use]
    pub fn contains(&self, chat: &ChatId) -> bool {
        self.0.contains(chat)
    }

    /// Returns `true` if any of the given chats belongs to this conversation.
    #[must_use]
    pub fn intersects<'a>(&self, chats: impl IntoIterator<Item = &'a ChatId>) -> bool {
        chats.into_iter().any(|chat| self.0.contains(chat))
    }

    /// Iterates the member chats in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &ChatId> {
        self.0.iter()
    }

    /// Returns the number of member chats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set has no member chats.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<ChatId> for ChatSet {
    fn from_iter<I: IntoIterator<Item = ChatId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ChatSet {
    type Item = &'a ChatId;
    type IntoIter = std::collections::btree_set::Iter<'a, ChatId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ChatSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(ChatId::as_str)
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "[{joined}]")
    }
}
