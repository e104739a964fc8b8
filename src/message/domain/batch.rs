//! Raw rows delivered by a sync channel, ready for the write path.

use super::{Attachment, ChatId, Message, Participant, Timestamp};
use serde::{Deserialize, Serialize};

/// Visible message count for a chat as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatTotal {
    /// Chat the count applies to.
    pub chat_id: ChatId,
    /// Number of visible messages the remote holds for the chat.
    pub visible: u64,
}

impl ChatTotal {
    /// Creates a chat total.
    #[must_use]
    pub const fn new(chat_id: ChatId, visible: u64) -> Self {
        Self { chat_id, visible }
    }
}

/// A batch of remote rows merged in one write.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBatch {
    /// Messages, reactions included.
    pub messages: Vec<Message>,
    /// Attachment metadata for the messages.
    pub attachments: Vec<Attachment>,
    /// Participant roster entries.
    pub participants: Vec<Participant>,
    /// Remote visible counts.
    pub totals: Vec<ChatTotal>,
}

impl MessageBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a batch holding only messages.
    #[must_use]
    pub fn of_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    /// Adds a message.
    #[must_use]
    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Adds an attachment.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Adds a participant.
    #[must_use]
    pub fn with_participant(mut self, participant: Participant) -> Self {
        self.participants.push(participant);
        self
    }

    /// Adds a remote total.
    #[must_use]
    pub fn with_total(mut self, total: ChatTotal) -> Self {
        self.totals.push(total);
        self
    }

    /// Returns `true` when the batch carries nothing to write.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
            && self.attachments.is_empty()
            && self.participants.is_empty()
            && self.totals.is_empty()
    }

    /// Returns the oldest message timestamp in the batch.
    #[must_use]
    pub fn oldest(&self) -> Option<Timestamp> {
        self.messages.iter().map(Message::created_at).min()
    }

    /// Returns the newest message timestamp in the batch.
    #[must_use]
    pub fn newest(&self) -> Option<Timestamp> {
        self.messages.iter().map(Message::created_at).max()
    }
}
