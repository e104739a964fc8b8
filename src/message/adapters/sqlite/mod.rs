//! `SQLite` implementation of the `MessageStore` port using Diesel ORM.
//!
//! The mirror lives in a single `SQLite` file. Merges run inside one
//! transaction per batch; uniqueness on `guid` plus `INSERT OR IGNORE` makes
//! the write path idempotent across sync channels.

mod blocking;
pub mod models;
pub mod schema;

pub use blocking::SqlitePool;

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use camino::Utf8Path;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use tokio::sync::broadcast;
use tracing::debug;

use self::blocking::{get_conn, run_blocking};
use self::models::{
    AttachmentRow, MessageRow, NewSyncRange, ParticipantRow, SummaryRow, SyncRangeRow,
    TombstoneRow, from_db_count,
};
use self::schema::{
    SCHEMA_SQL, attachments, chat_summaries, messages, participants, sync_ranges, tombstones,
};
use super::feed::ChangeFeed;
use crate::message::{
    domain::{
        Attachment, ChatId, ChatSet, ChatSummary, Message, MessageBatch, MessageGuid,
        Participant, SortKey, SyncRange, Tombstone,
    },
    error::{StoreError, StoreResult},
    ports::store::{ChangeKind, LocalEdit, MergeOutcome, MessageStore, StoreChange},
};

/// Per-connection settings applied when the pool hands out a connection.
#[derive(Debug, Clone, Copy)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute("PRAGMA busy_timeout = 5000;")
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// `SQLite` implementation of [`MessageStore`].
///
/// Uses Diesel with r2d2 connection pooling. Thread-safe for concurrent
/// access; writes are expected to arrive through a single write path.
///
/// # Example
///
/// ```no_run
/// use camino::Utf8Path;
/// use scrollback::message::adapters::sqlite::SqliteMessageStore;
///
/// let store = SqliteMessageStore::open(Utf8Path::new("mirror.sqlite3"))?;
/// # Ok::<(), scrollback::message::error::StoreError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SqliteMessageStore {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl SqliteMessageStore {
    /// Opens (creating if needed) a mirror database file.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the pool cannot be built or the schema cannot
    /// be created.
    pub fn open(path: &Utf8Path) -> StoreResult<Self> {
        Self::with_manager(ConnectionManager::new(path.as_str()), 4)
    }

    /// Opens a private in-memory database.
    ///
    /// The pool holds a single connection because every `SQLite` in-memory
    /// connection is its own database.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the pool cannot be built or the schema cannot
    /// be created.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_manager(ConnectionManager::new(":memory:"), 1)
    }

    fn with_manager(
        manager: ConnectionManager<SqliteConnection>,
        max_size: u32,
    ) -> StoreResult<Self> {
        let pool = Pool::builder()
            .max_size(max_size)
            .idle_timeout(None)
            .max_lifetime(None)
            .connection_customizer(Box::new(ConnectionOptions))
            .build(manager)
            .map_err(|e| StoreError::connection(e.to_string()))?;
        get_conn(&pool)?
            .batch_execute(SCHEMA_SQL)
            .map_err(StoreError::database)?;
        Ok(Self {
            pool,
            feed: ChangeFeed::new(),
        })
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn query<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut SqliteConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        run_blocking(move || {
            let mut conn = get_conn(&pool)?;
            f(&mut conn)
        })
        .await
    }
}

fn chat_keys(chats: &ChatSet) -> Vec<String> {
    chats.iter().map(|chat| chat.as_str().to_owned()).collect()
}

fn guid_keys(guids: &[MessageGuid]) -> Vec<String> {
    guids.iter().map(|guid| guid.as_str().to_owned()).collect()
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn into_messages(rows: Vec<MessageRow>) -> StoreResult<Vec<Message>> {
    rows.into_iter().map(MessageRow::into_domain).collect()
}

fn visible_page(
    conn: &mut SqliteConnection,
    chats: Vec<String>,
    offset: i64,
    limit: i64,
) -> StoreResult<Vec<Message>> {
    let rows = messages::table
        .filter(messages::chat_id.eq_any(chats))
        .filter(messages::is_reaction.eq(false))
        .filter(messages::deleted_at.is_null())
        .order((messages::created_at.desc(), messages::guid.desc()))
        .offset(offset)
        .limit(limit)
        .select(MessageRow::as_select())
        .load(conn)?;
    into_messages(rows)
}

fn load_summary(conn: &mut SqliteConnection, chat: &ChatId) -> StoreResult<ChatSummary> {
    chat_summaries::table
        .find(chat.as_str())
        .select(SummaryRow::as_select())
        .first(conn)
        .optional()?
        .map_or_else(|| Ok(ChatSummary::empty(chat.clone())), SummaryRow::into_domain)
}

fn cached_summary<'a>(
    conn: &mut SqliteConnection,
    cache: &'a mut BTreeMap<ChatId, ChatSummary>,
    chat: &ChatId,
) -> StoreResult<&'a mut ChatSummary> {
    match cache.entry(chat.clone()) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => Ok(entry.insert(load_summary(conn, chat)?)),
    }
}

fn save_summary(conn: &mut SqliteConnection, summary: &ChatSummary) -> StoreResult<()> {
    diesel::replace_into(chat_summaries::table)
        .values(&SummaryRow::from_domain(summary)?)
        .execute(conn)?;
    Ok(())
}

#[derive(Debug, Default)]
struct MergeEffects {
    outcome: MergeOutcome,
    touched: BTreeSet<ChatId>,
    roster: BTreeSet<ChatId>,
}

fn merge_batch(conn: &mut SqliteConnection, batch: MessageBatch) -> StoreResult<MergeEffects> {
    let mut effects = MergeEffects::default();
    let mut summaries: BTreeMap<ChatId, ChatSummary> = BTreeMap::new();

    for message in batch.messages {
        let tombstoned: i64 = tombstones::table
            .filter(tombstones::guid.eq(message.guid().as_str()))
            .count()
            .get_result(conn)?;
        if tombstoned > 0 {
            effects.outcome.suppressed += 1;
            continue;
        }
        let inserted = diesel::insert_or_ignore_into(messages::table)
            .values(&MessageRow::from_domain(&message))
            .execute(conn)?;
        if inserted == 0 {
            effects.outcome.ignored += 1;
            continue;
        }
        cached_summary(conn, &mut summaries, message.chat_id())?.absorb(&message);
        effects.touched.insert(message.chat_id().clone());
        effects.outcome.inserted.push(message.guid().clone());
    }

    for attachment in &batch.attachments {
        let inserted = diesel::insert_or_ignore_into(attachments::table)
            .values(&AttachmentRow::from_domain(attachment)?)
            .execute(conn)?;
        if inserted == 0 {
            continue;
        }
        let owner: Option<String> = messages::table
            .find(attachment.message_guid.as_str())
            .select(messages::chat_id)
            .first(conn)
            .optional()?;
        if let Some(chat) = owner {
            effects.touched.insert(ChatId::new(chat));
        }
    }

    for participant in &batch.participants {
        diesel::replace_into(participants::table)
            .values(&ParticipantRow::from(participant))
            .execute(conn)?;
        effects.roster.insert(participant.chat_id.clone());
    }

    for total in batch.totals {
        let summary = cached_summary(conn, &mut summaries, &total.chat_id)?;
        if summary.remote_total != Some(total.visible) {
            summary.remote_total = Some(total.visible);
            effects.outcome.totals_changed += 1;
            effects.touched.insert(total.chat_id);
        }
    }

    for summary in summaries.values() {
        save_summary(conn, summary)?;
    }
    Ok(effects)
}

fn tombstone_message(
    conn: &mut SqliteConnection,
    tombstone: &Tombstone,
) -> StoreResult<(bool, Option<ChatId>)> {
    let recorded = diesel::insert_or_ignore_into(tombstones::table)
        .values(&TombstoneRow::from(tombstone))
        .execute(conn)?;
    if recorded == 0 {
        return Ok((false, None));
    }
    let row = messages::table
        .find(tombstone.guid.as_str())
        .select(MessageRow::as_select())
        .first(conn)
        .optional()?;
    let Some(message) = row.map(MessageRow::into_domain).transpose()? else {
        return Ok((true, None));
    };
    if message.is_deleted() {
        return Ok((true, None));
    }
    diesel::update(messages::table.find(tombstone.guid.as_str()))
        .set(messages::deleted_at.eq(Some(tombstone.deleted_at.as_millis())))
        .execute(conn)?;

    let chat = message.chat_id().clone();
    if message.is_visible() {
        let mut summary = load_summary(conn, &chat)?;
        summary.remote_total = summary.remote_total.map(|total| total.saturating_sub(1));
        let newest = visible_page(conn, vec![chat.as_str().to_owned()], 0, 1)?;
        let latest = newest.first();
        summary.latest_guid = latest.map(|m| m.guid().clone());
        summary.latest_at = latest.map(Message::created_at);
        summary.latest_text = latest.and_then(|m| m.text().map(ToOwned::to_owned));
        save_summary(conn, &summary)?;
    }
    Ok((true, Some(chat)))
}

fn edit_message(conn: &mut SqliteConnection, edit: &LocalEdit) -> StoreResult<Option<ChatId>> {
    let updated = diesel::update(messages::table.find(edit.guid.as_str()))
        .set((
            messages::text.eq(Some(edit.text.as_str())),
            messages::edited_at.eq(Some(edit.edited_at.as_millis())),
        ))
        .execute(conn)?;
    if updated == 0 {
        return Ok(None);
    }
    let chat: String = messages::table
        .find(edit.guid.as_str())
        .select(messages::chat_id)
        .first(conn)?;
    let chat_id = ChatId::new(chat);
    let mut summary = load_summary(conn, &chat_id)?;
    if summary.latest_guid.as_ref() == Some(&edit.guid) {
        summary.latest_text = Some(edit.text.clone());
        save_summary(conn, &summary)?;
    }
    Ok(Some(chat_id))
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn merge(&self, batch: MessageBatch) -> StoreResult<MergeOutcome> {
        let effects = self
            .query(move |conn| conn.transaction(|tx| merge_batch(tx, batch)))
            .await?;
        debug!(
            inserted = effects.outcome.inserted.len(),
            ignored = effects.outcome.ignored,
            suppressed = effects.outcome.suppressed,
            "merged batch into sqlite mirror"
        );
        self.feed
            .publish(effects.touched.into_iter().collect(), ChangeKind::Messages);
        self.feed
            .publish(effects.roster.into_iter().collect(), ChangeKind::Participants);
        Ok(effects.outcome)
    }

    async fn record_tombstone(&self, tombstone: Tombstone) -> StoreResult<bool> {
        let (recorded, chat) = self
            .query(move |conn| conn.transaction(|tx| tombstone_message(tx, &tombstone)))
            .await?;
        if let Some(chat_id) = chat {
            self.feed
                .publish(ChatSet::single(chat_id), ChangeKind::Messages);
        }
        Ok(recorded)
    }

    async fn apply_local_edit(&self, edit: LocalEdit) -> StoreResult<bool> {
        let chat = self
            .query(move |conn| conn.transaction(|tx| edit_message(tx, &edit)))
            .await?;
        let Some(chat_id) = chat else {
            return Ok(false);
        };
        self.feed
            .publish(ChatSet::single(chat_id), ChangeKind::Messages);
        Ok(true)
    }

    async fn record_sync_range(&self, range: SyncRange) -> StoreResult<()> {
        let chat = range.chat_id.clone();
        self.query(move |conn| {
            diesel::insert_into(sync_ranges::table)
                .values(&NewSyncRange::from(&range))
                .execute(conn)?;
            Ok(())
        })
        .await?;
        self.feed.publish(ChatSet::single(chat), ChangeKind::SyncRanges);
        Ok(())
    }

    async fn clear_sync_ranges(&self, chats: &ChatSet) -> StoreResult<usize> {
        let keys = chat_keys(chats);
        let removed = self
            .query(move |conn| {
                Ok(
                    diesel::delete(sync_ranges::table.filter(sync_ranges::chat_id.eq_any(keys)))
                        .execute(conn)?,
                )
            })
            .await?;
        if removed > 0 {
            self.feed.publish(chats.clone(), ChangeKind::SyncRanges);
        }
        Ok(removed)
    }

    async fn sync_ranges(&self, chats: &ChatSet) -> StoreResult<Vec<SyncRange>> {
        let keys = chat_keys(chats);
        self.query(move |conn| {
            sync_ranges::table
                .filter(sync_ranges::chat_id.eq_any(keys))
                .order(sync_ranges::id.asc())
                .select(SyncRangeRow::as_select())
                .load(conn)?
                .into_iter()
                .map(SyncRangeRow::into_domain)
                .collect()
        })
        .await
    }

    async fn visible_counts(&self, chats: &ChatSet) -> StoreResult<BTreeMap<ChatId, u64>> {
        let keys = chat_keys(chats);
        self.query(move |conn| {
            let rows: Vec<(String, i64)> = messages::table
                .filter(messages::chat_id.eq_any(keys))
                .filter(messages::is_reaction.eq(false))
                .filter(messages::deleted_at.is_null())
                .group_by(messages::chat_id)
                .select((messages::chat_id, diesel::dsl::count_star()))
                .load(conn)?;
            rows.into_iter()
                .map(|(chat, count)| Ok((ChatId::new(chat), from_db_count(count)?)))
                .collect()
        })
        .await
    }

    async fn page(&self, chats: &ChatSet, offset: u64, limit: u64) -> StoreResult<Vec<Message>> {
        let keys = chat_keys(chats);
        self.query(move |conn| visible_page(conn, keys, clamp_i64(offset), clamp_i64(limit)))
            .await
    }

    async fn message(&self, guid: &MessageGuid) -> StoreResult<Option<Message>> {
        let key = guid.as_str().to_owned();
        self.query(move |conn| {
            messages::table
                .find(key)
                .select(MessageRow::as_select())
                .first(conn)
                .optional()?
                .map(MessageRow::into_domain)
                .transpose()
        })
        .await
    }

    async fn messages(&self, guids: &[MessageGuid]) -> StoreResult<Vec<Message>> {
        let keys = guid_keys(guids);
        self.query(move |conn| {
            let rows = messages::table
                .filter(messages::guid.eq_any(keys))
                .select(MessageRow::as_select())
                .load(conn)?;
            into_messages(rows)
        })
        .await
    }

    async fn count_newer(&self, chats: &ChatSet, key: &SortKey) -> StoreResult<u64> {
        let keys = chat_keys(chats);
        let at = key.created_at().as_millis();
        let guid = key.guid().as_str().to_owned();
        self.query(move |conn| {
            let count: i64 = messages::table
                .filter(messages::chat_id.eq_any(keys))
                .filter(messages::is_reaction.eq(false))
                .filter(messages::deleted_at.is_null())
                .filter(
                    messages::created_at
                        .gt(at)
                        .or(messages::created_at.eq(at).and(messages::guid.gt(guid))),
                )
                .count()
                .get_result(conn)?;
            from_db_count(count)
        })
        .await
    }

    async fn reactions_for(&self, targets: &[MessageGuid]) -> StoreResult<Vec<Message>> {
        let keys = guid_keys(targets);
        self.query(move |conn| {
            let rows = messages::table
                .filter(messages::reaction_target.eq_any(keys))
                .filter(messages::deleted_at.is_null())
                .order((messages::created_at.asc(), messages::guid.asc()))
                .select(MessageRow::as_select())
                .load(conn)?;
            into_messages(rows)
        })
        .await
    }

    async fn attachments_for(&self, guids: &[MessageGuid]) -> StoreResult<Vec<Attachment>> {
        let keys = guid_keys(guids);
        self.query(move |conn| {
            attachments::table
                .filter(attachments::message_guid.eq_any(keys))
                .order(attachments::guid.asc())
                .select(AttachmentRow::as_select())
                .load(conn)?
                .into_iter()
                .map(AttachmentRow::into_domain)
                .collect()
        })
        .await
    }

    async fn participants(&self, chats: &ChatSet) -> StoreResult<Vec<Participant>> {
        let keys = chat_keys(chats);
        self.query(move |conn| {
            let rows = participants::table
                .filter(participants::chat_id.eq_any(keys))
                .select(ParticipantRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(Participant::from).collect())
        })
        .await
    }

    async fn participants_by_handle(&self, handle_ids: &[i64]) -> StoreResult<Vec<Participant>> {
        let handles = handle_ids.to_vec();
        self.query(move |conn| {
            let rows = participants::table
                .filter(participants::handle_id.eq_any(handles))
                .select(ParticipantRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(Participant::from).collect())
        })
        .await
    }

    async fn tombstoned(&self, guids: &[MessageGuid]) -> StoreResult<Vec<MessageGuid>> {
        let keys = guid_keys(guids);
        self.query(move |conn| {
            let rows: Vec<String> = tombstones::table
                .filter(tombstones::guid.eq_any(keys))
                .select(tombstones::guid)
                .load(conn)?;
            Ok(rows.into_iter().map(MessageGuid::new).collect())
        })
        .await
    }

    async fn summaries(&self, chats: &ChatSet) -> StoreResult<Vec<ChatSummary>> {
        let keys = chat_keys(chats);
        self.query(move |conn| {
            chat_summaries::table
                .filter(chat_summaries::chat_id.eq_any(keys))
                .select(SummaryRow::as_select())
                .load(conn)?
                .into_iter()
                .map(SummaryRow::into_domain)
                .collect()
        })
        .await
    }

    async fn recent_chats(&self, limit: usize) -> StoreResult<Vec<ChatSummary>> {
        let max_rows = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query(move |conn| {
            chat_summaries::table
                .filter(chat_summaries::latest_at.is_not_null())
                .order((chat_summaries::latest_at.desc(), chat_summaries::chat_id.asc()))
                .limit(max_rows)
                .select(SummaryRow::as_select())
                .load(conn)?
                .into_iter()
                .map(SummaryRow::into_domain)
                .collect()
        })
        .await
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.feed.subscribe()
    }
}
