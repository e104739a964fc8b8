//! In-memory implementation of the `MessageStore` port.
//!
//! Provides a simple, thread-safe store for unit and integration testing
//! without database dependencies. Not suitable for production use.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::feed::ChangeFeed;
use crate::message::{
    domain::{
        Attachment, ChatId, ChatSet, ChatSummary, Message, MessageBatch, MessageGuid,
        Participant, SortKey, SyncRange, Timestamp, Tombstone,
    },
    error::{StoreError, StoreResult},
    ports::store::{ChangeKind, LocalEdit, MergeOutcome, MessageStore, StoreChange},
};

#[derive(Debug, Default)]
struct State {
    messages: HashMap<MessageGuid, Message>,
    attachments: HashMap<MessageGuid, Vec<Attachment>>,
    participants: BTreeMap<(ChatId, i64), Participant>,
    summaries: BTreeMap<ChatId, ChatSummary>,
    sync_ranges: Vec<SyncRange>,
    tombstones: HashMap<MessageGuid, Timestamp>,
}

impl State {
    fn summary_mut(&mut self, chat: &ChatId) -> &mut ChatSummary {
        self.summaries
            .entry(chat.clone())
            .or_insert_with(|| ChatSummary::empty(chat.clone()))
    }

    fn visible_in<'a>(&'a self, chats: &'a ChatSet) -> impl Iterator<Item = &'a Message> + 'a {
        self.messages
            .values()
            .filter(move |message| message.is_visible() && chats.contains(message.chat_id()))
    }

    /// Recomputes the latest-message fields of a chat after a deletion.
    fn refresh_latest(&mut self, chat: &ChatId) {
        let single = ChatSet::single(chat.clone());
        let newest = self
            .visible_in(&single)
            .min_by_key(|message| SortKey::of(message))
            .cloned();
        let summary = self.summary_mut(chat);
        summary.latest_guid = newest.as_ref().map(|message| message.guid().clone());
        summary.latest_at = newest.as_ref().map(Message::created_at);
        summary.latest_text = newest
            .as_ref()
            .and_then(|message| message.text().map(ToOwned::to_owned));
    }
}

/// In-memory implementation of [`MessageStore`].
///
/// Thread-safe via internal [`RwLock`]. Suitable for tests only.
///
/// # Example
///
/// ```
/// use scrollback::message::adapters::memory::InMemoryMessageStore;
///
/// let store = InMemoryMessageStore::new();
/// assert!(store.is_empty());
/// ```
#[derive(Debug, Default, Clone)]
pub struct InMemoryMessageStore {
    state: Arc<RwLock<State>>,
    feed: ChangeFeed,
}

impl InMemoryMessageStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored rows, reactions and deleted rows included.
    ///
    /// Returns `0` if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state
            .read()
            .map(|guard| guard.messages.len())
            .unwrap_or(0)
    }

    /// Returns `true` if no rows are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|e| StoreError::connection(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|e| StoreError::connection(format!("lock poisoned: {e}")))
    }
}

fn to_usize(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn to_u64(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn merge(&self, batch: MessageBatch) -> StoreResult<MergeOutcome> {
        let MessageBatch {
            messages,
            attachments,
            participants,
            totals,
        } = batch;
        let mut outcome = MergeOutcome::default();
        let mut touched = BTreeSet::new();
        let mut roster = BTreeSet::new();
        {
            let mut guard = self.write()?;
            let state = &mut *guard;

            for message in messages {
                if state.tombstones.contains_key(message.guid()) {
                    outcome.suppressed += 1;
                    continue;
                }
                if state.messages.contains_key(message.guid()) {
                    outcome.ignored += 1;
                    continue;
                }
                state.summary_mut(message.chat_id()).absorb(&message);
                touched.insert(message.chat_id().clone());
                outcome.inserted.push(message.guid().clone());
                state.messages.insert(message.guid().clone(), message);
            }

            for attachment in attachments {
                if let Some(owner) = state.messages.get(&attachment.message_guid) {
                    touched.insert(owner.chat_id().clone());
                }
                let owned = state
                    .attachments
                    .entry(attachment.message_guid.clone())
                    .or_default();
                if !owned.iter().any(|known| known.guid == attachment.guid) {
                    owned.push(attachment);
                }
            }

            for participant in participants {
                roster.insert(participant.chat_id.clone());
                state.participants.insert(
                    (participant.chat_id.clone(), participant.handle_id),
                    participant,
                );
            }

            for total in totals {
                let summary = state.summary_mut(&total.chat_id);
                if summary.remote_total != Some(total.visible) {
                    summary.remote_total = Some(total.visible);
                    outcome.totals_changed += 1;
                    touched.insert(total.chat_id);
                }
            }
        }

        self.feed
            .publish(touched.into_iter().collect(), ChangeKind::Messages);
        self.feed
            .publish(roster.into_iter().collect(), ChangeKind::Participants);
        Ok(outcome)
    }

    async fn record_tombstone(&self, tombstone: Tombstone) -> StoreResult<bool> {
        let deleted_chat = {
            let mut guard = self.write()?;
            let state = &mut *guard;
            if state.tombstones.contains_key(&tombstone.guid) {
                return Ok(false);
            }
            state
                .tombstones
                .insert(tombstone.guid.clone(), tombstone.deleted_at);

            let Some(message) = state.messages.get_mut(&tombstone.guid) else {
                return Ok(true);
            };
            if message.is_deleted() {
                return Ok(true);
            }
            let was_visible = message.is_visible();
            message.mark_deleted(tombstone.deleted_at);
            let chat = message.chat_id().clone();
            if was_visible {
                let summary = state.summary_mut(&chat);
                summary.remote_total = summary.remote_total.map(|total| total.saturating_sub(1));
                state.refresh_latest(&chat);
            }
            chat
        };
        self.feed
            .publish(ChatSet::single(deleted_chat), ChangeKind::Messages);
        Ok(true)
    }

    async fn apply_local_edit(&self, edit: LocalEdit) -> StoreResult<bool> {
        let chat = {
            let mut guard = self.write()?;
            let state = &mut *guard;
            let Some(message) = state.messages.get_mut(&edit.guid) else {
                return Ok(false);
            };
            message.apply_edit(edit.text.clone(), edit.edited_at);
            let chat = message.chat_id().clone();
            let summary = state.summary_mut(&chat);
            if summary.latest_guid.as_ref() == Some(&edit.guid) {
                summary.latest_text = Some(edit.text);
            }
            chat
        };
        self.feed.publish(ChatSet::single(chat), ChangeKind::Messages);
        Ok(true)
    }

    async fn record_sync_range(&self, range: SyncRange) -> StoreResult<()> {
        let chat = range.chat_id.clone();
        self.write()?.sync_ranges.push(range);
        self.feed.publish(ChatSet::single(chat), ChangeKind::SyncRanges);
        Ok(())
    }

    async fn clear_sync_ranges(&self, chats: &ChatSet) -> StoreResult<usize> {
        let removed = {
            let mut guard = self.write()?;
            let before = guard.sync_ranges.len();
            guard
                .sync_ranges
                .retain(|range| !chats.contains(&range.chat_id));
            before.saturating_sub(guard.sync_ranges.len())
        };
        if removed > 0 {
            self.feed.publish(chats.clone(), ChangeKind::SyncRanges);
        }
        Ok(removed)
    }

    async fn sync_ranges(&self, chats: &ChatSet) -> StoreResult<Vec<SyncRange>> {
        let guard = self.read()?;
        Ok(guard
            .sync_ranges
            .iter()
            .filter(|range| chats.contains(&range.chat_id))
            .cloned()
            .collect())
    }

    async fn visible_counts(&self, chats: &ChatSet) -> StoreResult<BTreeMap<ChatId, u64>> {
        let guard = self.read()?;
        let mut counts: BTreeMap<ChatId, u64> = BTreeMap::new();
        for message in guard.visible_in(chats) {
            let count = counts.entry(message.chat_id().clone()).or_insert(0);
            *count = count.saturating_add(1);
        }
        Ok(counts)
    }

    async fn page(&self, chats: &ChatSet, offset: u64, limit: u64) -> StoreResult<Vec<Message>> {
        let guard = self.read()?;
        let mut rows: Vec<&Message> = guard.visible_in(chats).collect();
        rows.sort_by_cached_key(|message| SortKey::of(message));
        Ok(rows
            .into_iter()
            .skip(to_usize(offset))
            .take(to_usize(limit))
            .cloned()
            .collect())
    }

    async fn message(&self, guid: &MessageGuid) -> StoreResult<Option<Message>> {
        Ok(self.read()?.messages.get(guid).cloned())
    }

    async fn messages(&self, guids: &[MessageGuid]) -> StoreResult<Vec<Message>> {
        let guard = self.read()?;
        Ok(guids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|guid| guard.messages.get(guid).cloned())
            .collect())
    }

    async fn count_newer(&self, chats: &ChatSet, key: &SortKey) -> StoreResult<u64> {
        let guard = self.read()?;
        let newer = guard
            .visible_in(chats)
            .filter(|message| SortKey::of(message).is_newer_than(key))
            .count();
        Ok(to_u64(newer))
    }

    async fn reactions_for(&self, targets: &[MessageGuid]) -> StoreResult<Vec<Message>> {
        let wanted: HashSet<&MessageGuid> = targets.iter().collect();
        let guard = self.read()?;
        let mut reactions: Vec<Message> = guard
            .messages
            .values()
            .filter(|message| !message.is_deleted())
            .filter(|message| {
                message
                    .reaction()
                    .is_some_and(|reaction| wanted.contains(&reaction.target_guid()))
            })
            .cloned()
            .collect();
        reactions.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.guid().cmp(b.guid()))
        });
        Ok(reactions)
    }

    async fn attachments_for(&self, guids: &[MessageGuid]) -> StoreResult<Vec<Attachment>> {
        let guard = self.read()?;
        Ok(guids
            .iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .filter_map(|guid| guard.attachments.get(guid))
            .flatten()
            .cloned()
            .collect())
    }

    async fn participants(&self, chats: &ChatSet) -> StoreResult<Vec<Participant>> {
        let guard = self.read()?;
        Ok(guard
            .participants
            .values()
            .filter(|participant| chats.contains(&participant.chat_id))
            .cloned()
            .collect())
    }

    async fn participants_by_handle(&self, handle_ids: &[i64]) -> StoreResult<Vec<Participant>> {
        let guard = self.read()?;
        Ok(guard
            .participants
            .values()
            .filter(|participant| handle_ids.contains(&participant.handle_id))
            .cloned()
            .collect())
    }

    async fn tombstoned(&self, guids: &[MessageGuid]) -> StoreResult<Vec<MessageGuid>> {
        let guard = self.read()?;
        Ok(guids
            .iter()
            .filter(|guid| guard.tombstones.contains_key(*guid))
            .cloned()
            .collect())
    }

    async fn summaries(&self, chats: &ChatSet) -> StoreResult<Vec<ChatSummary>> {
        let guard = self.read()?;
        Ok(chats
            .iter()
            .filter_map(|chat| guard.summaries.get(chat).cloned())
            .collect())
    }

    async fn recent_chats(&self, limit: usize) -> StoreResult<Vec<ChatSummary>> {
        let guard = self.read()?;
        let mut active: Vec<ChatSummary> = guard
            .summaries
            .values()
            .filter(|summary| summary.latest_at.is_some())
            .cloned()
            .collect();
        active.sort_by(|a, b| {
            b.latest_at
                .cmp(&a.latest_at)
                .then_with(|| a.chat_id.cmp(&b.chat_id))
        });
        active.truncate(limit);
        Ok(active)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.feed.subscribe()
    }
}
