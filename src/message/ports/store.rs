//! Store port for the local message mirror.
//!
//! The store is the single source of truth: readers query it fresh on every
//! pass and never keep their own copy of the message list. Every query that
//! counts or orders messages considers only *visible* rows (not reactions,
//! not soft-deleted), ordered by [`SortKey`].

use crate::message::{
    domain::{
        Attachment, ChatId, ChatSet, ChatSummary, Message, MessageBatch, MessageGuid,
        Participant, SortKey, SyncRange, Timestamp, Tombstone,
    },
    error::StoreResult,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::broadcast;

/// What a store mutation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// Messages were inserted, deleted or edited, or remote totals moved.
    Messages,
    /// Participant roster entries were added or updated.
    Participants,
    /// Sync ranges were recorded or cleared.
    SyncRanges,
}

/// A change notification scoped to the chats it touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    /// Chats affected by the mutation.
    pub chats: ChatSet,
    /// Kind of mutation.
    pub kind: ChangeKind,
}

impl StoreChange {
    /// Creates a change notification.
    #[must_use]
    pub const fn new(chats: ChatSet, kind: ChangeKind) -> Self {
        Self { chats, kind }
    }

    /// Returns `true` if the change touches any chat of `chats`.
    #[must_use]
    pub fn touches(&self, chats: &ChatSet) -> bool {
        chats.intersects(&self.chats)
    }
}

/// A text edit made by the local user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEdit {
    /// Edited message.
    pub guid: MessageGuid,
    /// Replacement text.
    pub text: String,
    /// Edit time.
    pub edited_at: Timestamp,
}

/// Result of merging a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// GUIDs newly inserted.
    pub inserted: Vec<MessageGuid>,
    /// Messages ignored because their GUID was already present.
    pub ignored: usize,
    /// Messages dropped because their GUID was tombstoned.
    pub suppressed: usize,
    /// Chats whose remote total changed.
    pub totals_changed: usize,
}

impl MergeOutcome {
    /// Returns `true` if the merge changed nothing a reader could observe.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.inserted.is_empty() && self.totals_changed == 0
    }

    /// Folds another outcome into this one.
    pub fn absorb(&mut self, other: Self) {
        self.inserted.extend(other.inserted);
        self.ignored = self.ignored.saturating_add(other.ignored);
        self.suppressed = self.suppressed.saturating_add(other.suppressed);
        self.totals_changed = self.totals_changed.saturating_add(other.totals_changed);
    }
}

/// Port for the local message mirror.
///
/// # Implementation Notes
///
/// Implementations must ensure:
/// - GUIDs are unique; merges are insert-or-ignore, never replace
/// - Tombstoned GUIDs are never inserted again
/// - A chat summary only moves forward in sort order
/// - Every mutation publishes a [`StoreChange`] after it is visible to reads
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Merges a batch of remote rows.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails. Nothing is written on error.
    async fn merge(&self, batch: MessageBatch) -> StoreResult<MergeOutcome>;

    /// Records a tombstone, soft-deleting the message if present.
    ///
    /// Returns `true` when the tombstone was not already recorded.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    async fn record_tombstone(&self, tombstone: Tombstone) -> StoreResult<bool>;

    /// Applies a local edit. Returns `false` if the message is unknown.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    async fn apply_local_edit(&self, edit: LocalEdit) -> StoreResult<bool>;

    /// Records a synced interval.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    async fn record_sync_range(&self, range: SyncRange) -> StoreResult<()>;

    /// Drops every sync range of the given chats. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the write fails.
    async fn clear_sync_ranges(&self, chats: &ChatSet) -> StoreResult<usize>;

    /// Returns the sync ranges of the given chats.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    async fn sync_ranges(&self, chats: &ChatSet) -> StoreResult<Vec<SyncRange>>;

    /// Counts visible messages per chat. Chats without rows are omitted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    async fn visible_counts(&self, chats: &ChatSet) -> StoreResult<BTreeMap<ChatId, u64>>;

    /// Returns a page of visible messages, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    async fn page(&self, chats: &ChatSet, offset: u64, limit: u64) -> StoreResult<Vec<Message>>;

    /// Returns a message by GUID, including reactions and deleted rows.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    async fn message(&self, guid: &MessageGuid) -> StoreResult<Option<Message>>;

    /// Returns the known messages among `guids`, in no particular order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    async fn messages(&self, guids: &[MessageGuid]) -> StoreResult<Vec<Message>>;

    /// Counts visible messages of `chats` strictly newer than `key`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    async fn count_newer(&self, chats: &ChatSet, key: &SortKey) -> StoreResult<u64>;

    /// Returns reactions whose normalised target is one of `targets`,
    /// oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    async fn reactions_for(&self, targets: &[MessageGuid]) -> StoreResult<Vec<Message>>;

    /// Returns attachments owned by any of `guids`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    async fn attachments_for(&self, guids: &[MessageGuid]) -> StoreResult<Vec<Attachment>>;

    /// Returns the roster of the given chats.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    async fn participants(&self, chats: &ChatSet) -> StoreResult<Vec<Participant>>;

    /// Returns roster entries with any of the given handle ids, across chats.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    async fn participants_by_handle(&self, handle_ids: &[i64]) -> StoreResult<Vec<Participant>>;

    /// Returns the tombstoned GUIDs among `guids`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    async fn tombstoned(&self, guids: &[MessageGuid]) -> StoreResult<Vec<MessageGuid>>;

    /// Returns the summaries of the given chats.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    async fn summaries(&self, chats: &ChatSet) -> StoreResult<Vec<ChatSummary>>;

    /// Returns the `limit` most recently active chats, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the query fails.
    async fn recent_chats(&self, limit: usize) -> StoreResult<Vec<ChatSummary>>;

    /// Subscribes to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}
