//! The mirrored message record.
//!
//! A `Message` is one row of the local mirror. Reactions (tapbacks) are
//! messages too: they carry a [`ReactionRef`] pointing at their target and
//! never occupy a position in the conversation.

use super::{ChatId, MessageGuid, Timestamp};
use serde::{Deserialize, Serialize};

/// Identity of a message's sender.
///
/// The remote reports either an address (phone number or e-mail), a numeric
/// handle identifier, or both. Messages authored on this device carry
/// `is_from_me` instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sender {
    /// Address reported by the remote, if any.
    pub address: Option<String>,
    /// Remote handle identifier, if any.
    pub handle_id: Option<i64>,
    /// Whether the local user sent the message.
    pub is_from_me: bool,
}

impl Sender {
    /// A sender identified by address.
    #[must_use]
    pub fn address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            ..Self::default()
        }
    }

    /// A sender identified by handle only.
    #[must_use]
    pub fn handle(handle_id: i64) -> Self {
        Self {
            handle_id: Some(handle_id),
            ..Self::default()
        }
    }

    /// The local user.
    #[must_use]
    pub fn me() -> Self {
        Self {
            is_from_me: true,
            ..Self::default()
        }
    }

    /// Attaches a handle identifier to an address-based sender.
    #[must_use]
    pub const fn with_handle(mut self, handle_id: i64) -> Self {
        self.handle_id = Some(handle_id);
        self
    }
}

/// The kind of a reaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionKind {
    /// Heart.
    Love,
    /// Thumbs up.
    Like,
    /// Thumbs down.
    Dislike,
    /// Laughing.
    Laugh,
    /// Exclamation marks.
    Emphasize,
    /// Question mark.
    Question,
    /// Arbitrary emoji reaction.
    Emoji(String),
}

impl ReactionKind {
    /// Returns the storage code for the kind.
    #[must_use]
    pub fn code(&self) -> String {
        match self {
            Self::Love => "love".to_owned(),
            Self::Like => "like".to_owned(),
            Self::Dislike => "dislike".to_owned(),
            Self::Laugh => "laugh".to_owned(),
            Self::Emphasize => "emphasize".to_owned(),
            Self::Question => "question".to_owned(),
            Self::Emoji(emoji) => format!("emoji:{emoji}"),
        }
    }

    /// Parses a storage code. Unknown codes are kept as emoji reactions.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "love" => Self::Love,
            "like" => Self::Like,
            "dislike" => Self::Dislike,
            "laugh" => Self::Laugh,
            "emphasize" => Self::Emphasize,
            "question" => Self::Question,
            other => Self::Emoji(other.strip_prefix("emoji:").unwrap_or(other).to_owned()),
        }
    }
}

/// Link from a reaction to the message it reacts to.
///
/// The raw target may carry a namespacing prefix naming the message part the
/// reaction applies to (`p:0/<guid>`, `bp:<guid>`). [`Self::target_guid`]
/// strips it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReactionRef {
    /// Target as reported by the remote, prefix included.
    pub raw_target: String,
    /// Reaction kind.
    pub kind: ReactionKind,
    /// `true` when this record withdraws an earlier reaction.
    pub removed: bool,
}

impl ReactionRef {
    /// Creates a reaction reference.
    #[must_use]
    pub fn new(raw_target: impl Into<String>, kind: ReactionKind) -> Self {
        Self {
            raw_target: raw_target.into(),
            kind,
            removed: false,
        }
    }

    /// Marks the reaction as a withdrawal.
    #[must_use]
    pub const fn withdrawn(mut self) -> Self {
        self.removed = true;
        self
    }

    /// Returns the target GUID with any part prefix removed.
    ///
    /// # Examples
    ///
    /// ```
    /// use scrollback::message::domain::{ReactionKind, ReactionRef};
    ///
    /// let reaction = ReactionRef::new("p:0/ABC-123", ReactionKind::Like);
    /// assert_eq!(reaction.target_guid().as_str(), "ABC-123");
    /// ```
    #[must_use]
    pub fn target_guid(&self) -> MessageGuid {
        MessageGuid::new(strip_target_prefix(&self.raw_target))
    }
}

/// Removes a part prefix from a reaction target.
#[must_use]
pub fn strip_target_prefix(raw: &str) -> &str {
    if let Some(rest) = raw.strip_prefix("bp:") {
        return rest;
    }
    raw.strip_prefix("p:")
        .and_then(|part| part.split_once('/'))
        .map_or(raw, |(_, guid)| guid)
}

/// A message in the local mirror.
///
/// # Invariants
///
/// - `guid` never changes once assigned.
/// - A message with `deleted_at` set is soft-deleted: it stays in the store
///   so late deliveries can be recognised, but it has no position.
/// - A message with a reaction reference has no position.
///
/// # Examples
///
/// ```
/// use scrollback::message::domain::{ChatId, Message, MessageGuid, Sender, Timestamp};
///
/// let message = Message::builder(
///     MessageGuid::new("m1"),
///     ChatId::new("chat-a"),
///     Timestamp::from_millis(1_000),
/// )
/// .with_text("hello")
/// .with_sender(Sender::address("+15550100"))
/// .build();
///
/// assert!(message.is_visible());
/// assert_eq!(message.text(), Some("hello"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    guid: MessageGuid,
    chat_id: ChatId,
    created_at: Timestamp,
    sender: Sender,
    text: Option<String>,
    reaction: Option<ReactionRef>,
    thread_originator: Option<MessageGuid>,
    edited_at: Option<Timestamp>,
    deleted_at: Option<Timestamp>,
}

impl Message {
    /// Starts building a message.
    #[must_use]
    pub fn builder(guid: MessageGuid, chat_id: ChatId, created_at: Timestamp) -> MessageBuilder {
        MessageBuilder {
            message: Self {
                guid,
                chat_id,
                created_at,
                sender: Sender::default(),
                text: None,
                reaction: None,
                thread_originator: None,
                edited_at: None,
                deleted_at: None,
            },
        }
    }

    /// Returns the GUID.
    #[must_use]
    pub const fn guid(&self) -> &MessageGuid {
        &self.guid
    }

    /// Returns the owning chat.
    #[must_use]
    pub const fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Returns the sender identity.
    #[must_use]
    pub const fn sender(&self) -> &Sender {
        &self.sender
    }

    /// Returns the text payload.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Returns the reaction reference, if this message is a reaction.
    #[must_use]
    pub const fn reaction(&self) -> Option<&ReactionRef> {
        self.reaction.as_ref()
    }

    /// Returns `true` if this message is a reaction.
    #[must_use]
    pub const fn is_reaction(&self) -> bool {
        self.reaction.is_some()
    }

    /// Returns the thread originator this message replies to.
    #[must_use]
    pub const fn thread_originator(&self) -> Option<&MessageGuid> {
        self.thread_originator.as_ref()
    }

    /// Returns the last local edit time.
    #[must_use]
    pub const fn edited_at(&self) -> Option<Timestamp> {
        self.edited_at
    }

    /// Returns the soft-deletion time.
    #[must_use]
    pub const fn deleted_at(&self) -> Option<Timestamp> {
        self.deleted_at
    }

    /// Returns `true` if the message is soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns `true` if the message occupies a position.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        !self.is_reaction() && !self.is_deleted()
    }

    /// Applies a local edit.
    pub fn apply_edit(&mut self, text: impl Into<String>, edited_at: Timestamp) {
        self.text = Some(text.into());
        self.edited_at = Some(edited_at);
    }

    /// Soft-deletes the message.
    pub const fn mark_deleted(&mut self, deleted_at: Timestamp) {
        self.deleted_at = Some(deleted_at);
    }
}

/// Builder for [`Message`].
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    message: Message,
}

impl MessageBuilder {
    /// Sets the sender.
    #[must_use]
    pub fn with_sender(mut self, sender: Sender) -> Self {
        self.message.sender = sender;
        self
    }

    /// Sets the text payload.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.message.text = Some(text.into());
        self
    }

    /// Marks the message as a reaction.
    #[must_use]
    pub fn with_reaction(mut self, reaction: ReactionRef) -> Self {
        self.message.reaction = Some(reaction);
        self
    }

    /// Sets the thread originator this message replies to.
    #[must_use]
    pub fn replying_to(mut self, originator: MessageGuid) -> Self {
        self.message.thread_originator = Some(originator);
        self
    }

    /// Sets the edit timestamp.
    #[must_use]
    pub const fn edited_at(mut self, edited_at: Timestamp) -> Self {
        self.message.edited_at = Some(edited_at);
        self
    }

    /// Sets the soft-deletion timestamp.
    #[must_use]
    pub const fn deleted_at(mut self, deleted_at: Timestamp) -> Self {
        self.message.deleted_at = Some(deleted_at);
        self
    }

    /// Finishes the message.
    #[must_use]
    pub fn build(self) -> Message {
        self.message
    }
}
