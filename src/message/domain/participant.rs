//! Chat participant roster entries.

use super::ChatId;
use serde::{Deserialize, Serialize};

/// One participant of a chat, as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    /// Chat the participant belongs to.
    pub chat_id: ChatId,
    /// Remote handle identifier.
    pub handle_id: i64,
    /// Address (phone number or e-mail).
    pub address: String,
    /// Resolved display name, if the contact service supplied one.
    pub display_name: Option<String>,
}

impl Participant {
    /// Creates a participant without a display name.
    #[must_use]
    pub fn new(chat_id: ChatId, handle_id: i64, address: impl Into<String>) -> Self {
        Self {
            chat_id,
            handle_id,
            address: address.into(),
            display_name: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Returns the display name, falling back to the address.
    #[must_use]
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.address)
    }
}
