//! Targeted repair of gaps and missing messages.

use std::sync::Arc;

use mockable::Clock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::message::domain::{
    ChatSet, MessageGuid, SyncChannel, SyncCoverage, Timestamp,
};
use crate::message::ports::store::MessageStore;
use crate::paging::services::layout;
use crate::sync::config::RetryPolicy;
use crate::sync::domain::RepairRequest;
use crate::sync::error::SyncResult;
use crate::sync::ports::{FetchBounds, RemoteSource};

use super::fetch::{Fetcher, WindowFetch};
use super::repair_queue::RepairQueue;
use super::retry::with_retry;
use super::writer::WritePath;

/// Rows fetched beyond the gap itself, for the two neighbours the bounds
/// include.
const NEIGHBOURS: u64 = 2;

/// Drains the repair queue, one request at a time.
pub struct RepairWorker<S: ?Sized, R: ?Sized, C> {
    store: Arc<S>,
    remote: Arc<R>,
    writer: WritePath,
    queue: RepairQueue,
    clock: Arc<C>,
    retry: RetryPolicy,
}

impl<S, R, C> RepairWorker<S, R, C>
where
    S: MessageStore + ?Sized,
    R: RemoteSource + ?Sized,
    C: Clock,
{
    /// Creates a worker.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        remote: Arc<R>,
        writer: WritePath,
        queue: RepairQueue,
        clock: Arc<C>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            remote,
            writer,
            queue,
            clock,
            retry,
        }
    }

    /// Handles requests until the queue is dropped.
    pub async fn run(self, mut requests: mpsc::UnboundedReceiver<RepairRequest>) {
        while let Some(request) = requests.recv().await {
            let key = request.key();
            if let Err(err) = self.handle(&request).await {
                warn!(%key, error = %err, "repair failed");
            }
            self.queue.complete(&key);
        }
        debug!("repair worker stopped");
    }

    /// Handles one request.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the fetch or the merge fails.
    pub async fn handle(&self, request: &RepairRequest) -> SyncResult<()> {
        match request {
            RepairRequest::Range {
                chats,
                start,
                count,
            } => self.repair_range(chats, *start, *count).await,
            RepairRequest::Message { chats, guid } => self.repair_message(chats, guid).await,
        }
    }

    async fn repair_range(&self, chats: &ChatSet, start: u64, count: u64) -> SyncResult<()> {
        let bounds = self.bounds_around(chats, start, count).await?;
        let coverage = SyncCoverage::from_ranges(&self.store.sync_ranges(chats).await?);
        let lower = bounds.after.unwrap_or(Timestamp::MIN);
        let upper = bounds
            .before
            .unwrap_or_else(|| Timestamp::now(self.clock.as_ref()));
        if chats.iter().all(|chat| coverage.covers(chat, lower, upper)) {
            debug!(%chats, start, count, "range already synced; skipping repair");
            return Ok(());
        }

        let fetcher = Fetcher {
            remote: self.remote.as_ref(),
            writer: &self.writer,
            clock: self.clock.as_ref(),
            retry: self.retry,
        };
        let outcome = fetcher
            .run(WindowFetch {
                chats,
                bounds,
                limit: count.saturating_add(NEIGHBOURS),
                channel: SyncChannel::Repair,
            })
            .await?;
        info!(
            %chats,
            start,
            count,
            inserted = outcome.inserted.len(),
            "gap repaired"
        );
        Ok(())
    }

    /// Timestamp bounds of the positions `[start, start + count)`: the
    /// stored row just before them and the first stored row after them.
    async fn bounds_around(
        &self,
        chats: &ChatSet,
        start: u64,
        count: u64,
    ) -> SyncResult<FetchBounds> {
        let layout = layout::resolve(self.store.as_ref(), chats).await?;
        let first = layout.local_at_or_after(start);
        let past = layout.local_at_or_after(start.saturating_add(count));
        let before = match first.checked_sub(1) {
            Some(newer) => self.store.page(chats, newer, 1).await?.first().map(|m| m.created_at()),
            None => None,
        };
        let after = self
            .store
            .page(chats, past, 1)
            .await?
            .first()
            .map(|m| m.created_at());
        Ok(FetchBounds::between(after, before))
    }

    async fn repair_message(&self, chats: &ChatSet, guid: &MessageGuid) -> SyncResult<()> {
        if self.store.message(guid).await?.is_some() {
            debug!(%guid, "message already local");
            return Ok(());
        }
        let found = with_retry(self.retry, "fetch_message", || self.remote.fetch_message(guid))
            .await?;
        match found {
            Some(batch) => {
                let outcome = self.writer.merge(batch).await?;
                info!(%chats, %guid, inserted = outcome.inserted.len(), "message repaired");
            }
            None => debug!(%chats, %guid, "remote does not know message"),
        }
        Ok(())
    }
}
