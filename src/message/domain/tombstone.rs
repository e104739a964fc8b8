//! Deletion markers that outlive the deleted message.

use super::{MessageGuid, Timestamp};
use serde::{Deserialize, Serialize};

/// Records that a message was deleted.
///
/// Once recorded, any later delivery of the same GUID from any sync channel
/// is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tombstone {
    /// Deleted message.
    pub guid: MessageGuid,
    /// Deletion time.
    pub deleted_at: Timestamp,
}

impl Tombstone {
    /// Creates a tombstone.
    #[must_use]
    pub const fn new(guid: MessageGuid, deleted_at: Timestamp) -> Self {
        Self { guid, deleted_at }
    }
}
