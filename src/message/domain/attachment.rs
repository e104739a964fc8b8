//! Attachment metadata. Binary transfer lives outside this crate.

use super::MessageGuid;
use serde::{Deserialize, Serialize};

/// Metadata for one attachment of a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attachment {
    /// Attachment GUID.
    pub guid: String,
    /// Owning message.
    pub message_guid: MessageGuid,
    /// MIME type, when known.
    pub mime_type: Option<String>,
    /// Original file name.
    pub transfer_name: String,
    /// Size in bytes.
    pub total_bytes: u64,
}

impl Attachment {
    /// Creates attachment metadata.
    #[must_use]
    pub fn new(
        guid: impl Into<String>,
        message_guid: MessageGuid,
        transfer_name: impl Into<String>,
        total_bytes: u64,
    ) -> Self {
        Self {
            guid: guid.into(),
            message_guid,
            mime_type: None,
            transfer_name: transfer_name.into(),
            total_bytes,
        }
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}
