//! Repair requests raised when local data is insufficient.

use crate::message::domain::{ChatSet, MessageGuid};

/// Fire-and-continue repair requests toward the synchronization layer.
///
/// Calls never block on network work. Repeating a request while the first
/// is still in flight has no further effect.
#[cfg_attr(test, mockall::automock)]
pub trait RepairTrigger: Send + Sync {
    /// Signals that positions `[start, start + count)` of `chats` are not
    /// fully present locally.
    fn request_sync_for_range(&self, chats: &ChatSet, start: u64, count: u64);

    /// Signals that `guid` is expected to exist in `chats` but is not local.
    fn request_sync_for_message(&self, chats: &ChatSet, guid: &MessageGuid);
}
