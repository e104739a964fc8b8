//! Cached per-chat summary fields.

use super::{ChatId, Message, MessageGuid, SortKey, Timestamp};
use serde::{Deserialize, Serialize};

/// The "most recent message" fields cached for a chat, plus the visible
/// message count last reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    /// Chat the summary describes.
    pub chat_id: ChatId,
    /// GUID of the newest visible message known locally.
    pub latest_guid: Option<MessageGuid>,
    /// Timestamp of that message.
    pub latest_at: Option<Timestamp>,
    /// Text of that message.
    pub latest_text: Option<String>,
    /// Visible message count reported by the remote, if any.
    pub remote_total: Option<u64>,
}

impl ChatSummary {
    /// Creates an empty summary.
    #[must_use]
    pub const fn empty(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            latest_guid: None,
            latest_at: None,
            latest_text: None,
            remote_total: None,
        }
    }

    /// Folds a message into the summary if it is newer than the cached one.
    ///
    /// Reactions and deleted messages never become the latest message.
    /// Returns `true` when the summary changed.
    ///
    /// # Examples
    ///
    /// ```
    /// use scrollback::message::domain::{ChatId, ChatSummary, Message, MessageGuid, Timestamp};
    ///
    /// let chat = ChatId::new("c");
    /// let mut summary = ChatSummary::empty(chat.clone());
    /// let newer = Message::builder(MessageGuid::new("n"), chat.clone(), Timestamp::from_millis(20)).build();
    /// let older = Message::builder(MessageGuid::new("o"), chat, Timestamp::from_millis(10)).build();
    ///
    /// assert!(summary.absorb(&newer));
    /// assert!(!summary.absorb(&older));
    /// assert_eq!(summary.latest_guid.as_ref().map(MessageGuid::as_str), Some("n"));
    /// ```
    pub fn absorb(&mut self, message: &Message) -> bool {
        if !message.is_visible() || message.chat_id() != &self.chat_id {
            return false;
        }
        let incoming = SortKey::of(message);
        let is_newer = match (self.latest_at, self.latest_guid.as_ref()) {
            (Some(at), Some(guid)) => incoming.is_newer_than(&SortKey::new(at, guid.clone())),
            _ => true,
        };
        if is_newer {
            self.latest_guid = Some(message.guid().clone());
            self.latest_at = Some(message.created_at());
            self.latest_text = message.text().map(ToOwned::to_owned);
        }
        is_newer
    }

    /// Returns the declared visible count given the local visible count.
    #[must_use]
    pub fn declared_total(&self, local_visible: u64) -> u64 {
        self.remote_total.map_or(local_visible, |remote| remote.max(local_visible))
    }
}
