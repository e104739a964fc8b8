//! Fetch-merge-record, the step every window-based channel shares.

use mockable::Clock;
use tracing::debug;

use crate::message::domain::{ChatSet, SyncChannel, SyncRange, Timestamp};
use crate::message::ports::store::MergeOutcome;
use crate::sync::config::RetryPolicy;
use crate::sync::error::SyncResult;
use crate::sync::ports::{FetchBounds, RemoteSource};

use super::retry::with_retry;
use super::writer::WritePath;

/// A window fetch issued on behalf of one channel.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WindowFetch<'a> {
    pub(crate) chats: &'a ChatSet,
    pub(crate) bounds: FetchBounds,
    pub(crate) limit: u64,
    pub(crate) channel: SyncChannel,
}

/// Collaborators a window fetch needs.
pub(crate) struct Fetcher<'a, R: ?Sized, C> {
    pub(crate) remote: &'a R,
    pub(crate) writer: &'a WritePath,
    pub(crate) clock: &'a C,
    pub(crate) retry: RetryPolicy,
}

impl<R, C> Fetcher<'_, R, C>
where
    R: RemoteSource + ?Sized,
    C: Clock,
{
    /// Fetches the window with retry, merges it through the write path and
    /// records the interval it proved complete for every chat of the set.
    pub(crate) async fn run(&self, fetch: WindowFetch<'_>) -> SyncResult<MergeOutcome> {
        let batch = with_retry(self.retry, fetch.channel.as_str(), || {
            self.remote.fetch_window(fetch.chats, fetch.bounds, fetch.limit)
        })
        .await?;

        let returned = u64::try_from(batch.messages.len()).unwrap_or(u64::MAX);
        let oldest = batch.oldest();
        let outcome = self.writer.merge(batch).await?;

        let now = Timestamp::now(self.clock);
        let exhausted = returned < fetch.limit;
        if let Some((start, end)) = fetch.bounds.covered(oldest, exhausted, now) {
            for chat in fetch.chats.iter() {
                self.writer
                    .record_range(SyncRange::new(chat.clone(), start, end, now, fetch.channel))
                    .await?;
            }
        }
        debug!(
            channel = %fetch.channel,
            chats = %fetch.chats,
            returned,
            inserted = outcome.inserted.len(),
            "window merged"
        );
        Ok(outcome)
    }
}
