//! The store-backed ordered collection.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use mockable::Clock;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info, warn};

use super::hydrate::{Context, Hydrated, Hydrator};
use super::layout;
use crate::message::domain::{ChatSet, Message, MessageGuid, SortKey, Timestamp};
use crate::message::error::StoreResult;
use crate::message::ports::store::{ChangeKind, MessageStore, StoreChange};
use crate::paging::config::PagingConfig;
use crate::paging::domain::range::ranges_of;
use crate::paging::domain::{Availability, MessageView, PositionRange};
use crate::paging::ports::{OrderedCollection, RepairTrigger, SizeStream};

const UNOBSERVED: u64 = u64::MAX;

struct Inner<S: ?Sized, R: ?Sized, C> {
    store: Arc<S>,
    repair: Arc<R>,
    clock: Arc<C>,
    chats: ChatSet,
    hydrator: Mutex<Hydrator>,
    observed: AtomicU64,
}

/// Implements [`OrderedCollection`] for one conversation over a
/// [`MessageStore`].
///
/// The source owns the hydration caches for its chat set. Clones share
/// them.
pub struct StoreSource<S: ?Sized, R: ?Sized, C> {
    inner: Arc<Inner<S, R, C>>,
}

impl<S: ?Sized, R: ?Sized, C> Clone for StoreSource<S, R, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, R, C> StoreSource<S, R, C>
where
    S: MessageStore + ?Sized + 'static,
    R: RepairTrigger + ?Sized + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Creates a source for `chats`.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        repair: Arc<R>,
        clock: Arc<C>,
        chats: ChatSet,
        config: &PagingConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                repair,
                clock,
                chats,
                hydrator: Mutex::new(Hydrator::new(config.unavailable_timeout())),
                observed: AtomicU64::new(UNOBSERVED),
            }),
        }
    }

    /// Hydrates rows read elsewhere, reporting which views changed since
    /// they were last hydrated.
    ///
    /// # Errors
    ///
    /// Returns a store error when a related-row query fails.
    pub async fn hydrate(&self, rows: Vec<Message>) -> StoreResult<Hydrated> {
        let ctx = self.context();
        self.inner.hydrator.lock().await.hydrate(&ctx, rows).await
    }

    /// Drops the roster and view caches.
    pub async fn invalidate(&self) {
        self.inner.hydrator.lock().await.invalidate();
    }

    /// Returns the size recorded by the last [`OrderedCollection::size`]
    /// call, if any.
    #[must_use]
    pub fn last_observed_size(&self) -> Option<u64> {
        match self.inner.observed.load(Ordering::Acquire) {
            UNOBSERVED => None,
            size => Some(size),
        }
    }

    fn context(&self) -> Context<'_, S, R> {
        Context {
            store: self.inner.store.as_ref(),
            repair: self.inner.repair.as_ref(),
            chats: &self.inner.chats,
            now: Timestamp::now(self.inner.clock.as_ref()),
        }
    }

    /// Looks `guid` up; a message unknown locally and not tombstoned is
    /// queued for repair.
    async fn locate(&self, guid: &MessageGuid) -> StoreResult<Option<Message>> {
        if let Some(message) = self.inner.store.message(guid).await? {
            if message.is_visible() && self.inner.chats.contains(message.chat_id()) {
                self.inner.hydrator.lock().await.note_present(guid);
                return Ok(Some(message));
            }
            return Ok(None);
        }
        let tombstoned = self.inner.store.tombstoned(std::slice::from_ref(guid)).await?;
        if tombstoned.is_empty() {
            let ctx = self.context();
            self.inner.hydrator.lock().await.note_missing(&ctx, guid);
        }
        Ok(None)
    }

    async fn expected_size(&self) -> StoreResult<u64> {
        match self.last_observed_size() {
            Some(size) => Ok(size),
            None => self.size().await,
        }
    }
}

#[async_trait]
impl<S, R, C> OrderedCollection for StoreSource<S, R, C>
where
    S: MessageStore + ?Sized + 'static,
    R: RepairTrigger + ?Sized + 'static,
    C: Clock + Send + Sync + 'static,
{
    type Sizes = SizeObserver<S, R, C>;

    fn chats(&self) -> &ChatSet {
        &self.inner.chats
    }

    async fn size(&self) -> StoreResult<u64> {
        let size = layout::chat_counts(self.inner.store.as_ref(), &self.inner.chats)
            .await?
            .iter()
            .map(|count| count.declared)
            .fold(0_u64, u64::saturating_add);
        self.inner.observed.store(size, Ordering::Release);
        Ok(size)
    }

    fn observe_size(&self) -> Self::Sizes {
        SizeObserver {
            source: self.clone(),
            changes: self.inner.store.subscribe(),
            primed: false,
        }
    }

    async fn load(&self, start: u64, count: u64) -> StoreResult<Vec<(u64, Arc<MessageView>)>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let chats = &self.inner.chats;
        let end = start.saturating_add(count);
        let layout = layout::resolve(self.inner.store.as_ref(), chats).await?;
        let first = layout.local_at_or_after(start);
        let past = layout.local_at_or_after(end);
        let rows = self
            .inner
            .store
            .page(chats, first, past.saturating_sub(first))
            .await?;
        let positions: Vec<u64> = (first..)
            .take(rows.len())
            .map(|local| layout.position_of(local))
            .collect();

        let due = PositionRange::new(start, end.min(self.expected_size().await?));
        let missing = due.subtract(&ranges_of(positions.iter().copied()));
        if let (Some(head), Some(tail)) = (missing.first(), missing.last()) {
            let hole = PositionRange::new(head.start(), tail.end());
            info!(
                %chats,
                %hole,
                returned = rows.len(),
                due = due.len(),
                "local rows short of declared size"
            );
            self.inner
                .repair
                .request_sync_for_range(chats, hole.start(), hole.len());
        }

        let mut by_guid: HashMap<MessageGuid, u64> = HashMap::with_capacity(rows.len());
        for (row, position) in rows.iter().zip(&positions) {
            by_guid.entry(row.guid().clone()).or_insert(*position);
        }
        let views = self.hydrate(rows).await?.views;
        Ok(views
            .into_iter()
            .filter_map(|view| by_guid.get(view.guid()).map(|position| (*position, view)))
            .collect())
    }

    async fn load_by_key(&self, guid: &MessageGuid) -> StoreResult<Option<Arc<MessageView>>> {
        let Some(message) = self.locate(guid).await? else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![message]).await?.views.into_iter().next())
    }

    async fn get_key(&self, position: u64) -> StoreResult<Option<MessageGuid>> {
        let chats = &self.inner.chats;
        let layout = layout::resolve(self.inner.store.as_ref(), chats).await?;
        let Some(local) = layout.local_at(position) else {
            return Ok(None);
        };
        let rows = self.inner.store.page(chats, local, 1).await?;
        Ok(rows.into_iter().next().map(|row| row.guid().clone()))
    }

    async fn message_position(&self, guid: &MessageGuid) -> StoreResult<Option<u64>> {
        let Some(message) = self.locate(guid).await? else {
            return Ok(None);
        };
        let chats = &self.inner.chats;
        let newer = self
            .inner
            .store
            .count_newer(chats, &SortKey::of(&message))
            .await?;
        let layout = layout::resolve(self.inner.store.as_ref(), chats).await?;
        Ok(Some(layout.position_of(newer)))
    }

    async fn availability(&self, guid: &MessageGuid) -> StoreResult<Availability> {
        if let Some(message) = self.inner.store.message(guid).await? {
            if message.is_visible() {
                self.inner.hydrator.lock().await.note_present(guid);
                return Ok(Availability::Available);
            }
            return Ok(Availability::Unavailable);
        }
        let now = Timestamp::now(self.inner.clock.as_ref());
        let tracked = self.inner.hydrator.lock().await.status(guid, now);
        if let Some(status) = tracked {
            return Ok(status);
        }
        let tombstoned = self.inner.store.tombstoned(std::slice::from_ref(guid)).await?;
        if !tombstoned.is_empty() {
            return Ok(Availability::Unavailable);
        }
        let ctx = self.context();
        self.inner.hydrator.lock().await.note_missing(&ctx, guid);
        Ok(Availability::Loading { since: ctx.now })
    }
}

/// Size stream fed by the store's change notifications.
pub struct SizeObserver<S: ?Sized, R: ?Sized, C> {
    source: StoreSource<S, R, C>,
    changes: broadcast::Receiver<StoreChange>,
    primed: bool,
}

impl<S, R, C> SizeObserver<S, R, C>
where
    S: MessageStore + ?Sized + 'static,
    R: RepairTrigger + ?Sized + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Applies one change; returns `true` if it can affect the window.
    async fn absorb(&self, change: &StoreChange) -> bool {
        if !change.touches(self.source.chats()) {
            return false;
        }
        match change.kind {
            ChangeKind::Messages => true,
            ChangeKind::Participants => {
                self.source.invalidate().await;
                true
            }
            ChangeKind::SyncRanges => false,
        }
    }

    async fn current(&self) -> u64 {
        match self.source.size().await {
            Ok(size) => size,
            Err(err) => {
                warn!(error = %err, "size query failed; keeping last observed size");
                self.source.last_observed_size().unwrap_or_default()
            }
        }
    }
}

#[async_trait]
impl<S, R, C> SizeStream for SizeObserver<S, R, C>
where
    S: MessageStore + ?Sized + 'static,
    R: RepairTrigger + ?Sized + 'static,
    C: Clock + Send + Sync + 'static,
{
    async fn next(&mut self) -> Option<u64> {
        if !self.primed {
            self.primed = true;
            return Some(self.current().await);
        }
        loop {
            match self.changes.recv().await {
                Ok(change) => {
                    if self.absorb(&change).await {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "change feed lagged; re-reading size");
                    self.source.invalidate().await;
                    break;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
        loop {
            match self.changes.try_recv() {
                Ok(change) => {
                    self.absorb(&change).await;
                }
                Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    self.source.invalidate().await;
                }
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => break,
            }
        }
        Some(self.current().await)
    }
}
