//! Resolving declared sizes and hole positions from the store.

use crate::message::domain::{ChatId, ChatSet, MessageGuid, SortKey, SyncCoverage, Timestamp};
use crate::message::error::StoreResult;
use crate::message::ports::store::MessageStore;
use crate::paging::domain::PositionLayout;

/// Local and declared visible counts of one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCount {
    /// The chat.
    pub chat: ChatId,
    /// Visible rows stored locally.
    pub local: u64,
    /// Visible messages the conversation is declared to hold.
    pub declared: u64,
}

impl ChatCount {
    /// Messages declared but not stored.
    #[must_use]
    pub const fn missing(&self) -> u64 {
        self.declared.saturating_sub(self.local)
    }
}

/// Reads per-chat counts for `chats`.
///
/// # Errors
///
/// Returns a store error when a count query fails.
pub async fn chat_counts<S>(store: &S, chats: &ChatSet) -> StoreResult<Vec<ChatCount>>
where
    S: MessageStore + ?Sized,
{
    let local = store.visible_counts(chats).await?;
    let summaries = store.summaries(chats).await?;
    Ok(chats
        .iter()
        .map(|chat| {
            let visible = local.get(chat).copied().unwrap_or_default();
            let declared = summaries
                .iter()
                .find(|summary| summary.chat_id == *chat)
                .map_or(visible, |summary| summary.declared_total(visible));
            ChatCount {
                chat: chat.clone(),
                local: visible,
                declared,
            }
        })
        .collect())
}

/// Resolves where the missing messages of `chats` sit among the stored
/// rows.
///
/// A chat's missing messages belong to its newest unsynced gap: the stored
/// rows newer than the synced interval below that gap come first, then the
/// hole. A chat with fewer than two synced intervals has its missing
/// messages at the tail, which needs no hole entry.
///
/// # Errors
///
/// Returns a store error when a query fails.
pub async fn resolve<S>(store: &S, chats: &ChatSet) -> StoreResult<PositionLayout>
where
    S: MessageStore + ?Sized,
{
    let counts = chat_counts(store, chats).await?;
    if counts.iter().all(|count| count.missing() == 0) {
        return Ok(PositionLayout::contiguous());
    }
    let coverage = SyncCoverage::from_ranges(&store.sync_ranges(chats).await?);
    let mut holes = Vec::new();
    for count in counts.iter().filter(|count| count.missing() > 0) {
        let Some(floor) = coverage.newest_gap_floor(&count.chat) else {
            continue;
        };
        let above = SortKey::new(
            Timestamp::from_millis(floor.as_millis().saturating_add(1)),
            MessageGuid::new(""),
        );
        let boundary = store.count_newer(chats, &above).await?;
        holes.push((boundary, count.missing()));
    }
    Ok(PositionLayout::new(holes))
}
