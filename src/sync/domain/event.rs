//! Events delivered by the realtime channel.

use crate::message::domain::{MessageBatch, Tombstone};

/// One realtime delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RealtimeEvent {
    /// New rows, possibly with related attachments and roster entries.
    Messages(MessageBatch),
    /// A message was deleted remotely.
    Deleted(Tombstone),
}
