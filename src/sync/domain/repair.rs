//! Repair requests and their de-duplication keys.

use std::fmt;

use crate::message::domain::{ChatSet, MessageGuid};

/// A repair raised by the paging layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepairRequest {
    /// Positions `[start, start + count)` of `chats` are incomplete.
    Range {
        /// Conversation.
        chats: ChatSet,
        /// First missing position.
        start: u64,
        /// Number of missing positions.
        count: u64,
    },
    /// A message expected in `chats` is not local.
    Message {
        /// Conversation.
        chats: ChatSet,
        /// Missing message.
        guid: MessageGuid,
    },
}

impl RepairRequest {
    /// Returns the key under which the request is de-duplicated.
    #[must_use]
    pub fn key(&self) -> RepairKey {
        match self {
            Self::Range {
                chats,
                start,
                count,
            } => RepairKey::Range {
                chats: chats.clone(),
                start: *start,
                count: *count,
            },
            Self::Message { guid, .. } => RepairKey::Message(guid.clone()),
        }
    }

    /// Returns the conversation the request concerns.
    #[must_use]
    pub const fn chats(&self) -> &ChatSet {
        match self {
            Self::Range { chats, .. } | Self::Message { chats, .. } => chats,
        }
    }
}

/// Identity of an in-flight repair.
///
/// A message is fetched once whichever conversation asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RepairKey {
    /// A position range of one conversation.
    Range {
        /// Conversation.
        chats: ChatSet,
        /// First missing position.
        start: u64,
        /// Number of missing positions.
        count: u64,
    },
    /// One message.
    Message(MessageGuid),
}

impl fmt::Display for RepairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Range {
                chats,
                start,
                count,
            } => write!(f, "{chats}[{start}+{count}]"),
            Self::Message(guid) => write!(f, "message {guid}"),
        }
    }
}
