//! The five update channels feeding one store.
//!
//! Realtime push is the primary channel; backup push, the adaptive poll,
//! resume-on-foreground and the periodic sweep each cover a failure mode of
//! the ones above them. Every channel writes through the same
//! [`WritePath`], so the merge policy is identical whichever delivered a
//! row first.

use std::sync::Arc;

use mockable::Clock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::message::domain::{ChatSet, MessageGuid, SyncChannel, Timestamp};
use crate::message::ports::store::{LocalEdit, MergeOutcome, MessageStore};
use crate::sync::config::SyncConfig;
use crate::sync::domain::{RealtimeEvent, RealtimeHealth};
use crate::sync::error::SyncResult;
use crate::sync::ports::{FetchBounds, RealtimeLink, RemoteSource};

use super::fetch::{Fetcher, WindowFetch};
use super::retry::with_retry;
use super::writer::WritePath;

#[derive(Debug)]
struct ChannelState {
    health: RealtimeHealth,
    active_view: Option<ChatSet>,
}

/// Coordinates the sync channels.
///
/// The runtime drives [`Self::poll_tick`] and [`Self::periodic_sweep`] on
/// timers; the host forwards realtime events, backup pushes, view changes
/// and foreground transitions.
pub struct SyncOrchestrator<S: ?Sized, R: ?Sized, L: ?Sized, C> {
    store: Arc<S>,
    remote: Arc<R>,
    link: Arc<L>,
    writer: WritePath,
    clock: Arc<C>,
    config: SyncConfig,
    state: Mutex<ChannelState>,
}

impl<S, R, L, C> SyncOrchestrator<S, R, L, C>
where
    S: MessageStore + ?Sized,
    R: RemoteSource + ?Sized,
    L: RealtimeLink + ?Sized,
    C: Clock,
{
    /// Creates an orchestrator writing through `writer`.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        remote: Arc<R>,
        link: Arc<L>,
        writer: WritePath,
        clock: Arc<C>,
        config: SyncConfig,
    ) -> Self {
        let health = RealtimeHealth::new(Timestamp::now(clock.as_ref()), config.quiet_threshold());
        Self {
            store,
            remote,
            link,
            writer,
            clock,
            config,
            state: Mutex::new(ChannelState {
                health,
                active_view: None,
            }),
        }
    }

    /// Returns the configuration in use.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the write path shared by every channel.
    #[must_use]
    pub const fn writer(&self) -> &WritePath {
        &self.writer
    }

    fn now(&self) -> Timestamp {
        Timestamp::now(self.clock.as_ref())
    }

    fn fetcher(&self) -> Fetcher<'_, R, C> {
        Fetcher {
            remote: self.remote.as_ref(),
            writer: &self.writer,
            clock: self.clock.as_ref(),
            retry: self.config.retry,
        }
    }

    /// Applies a realtime delivery and marks the channel alive.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the write fails.
    pub async fn on_realtime(&self, event: RealtimeEvent) -> SyncResult<MergeOutcome> {
        let now = self.now();
        self.state.lock().await.health.record(now);
        match event {
            RealtimeEvent::Messages(batch) => self.writer.merge(batch).await,
            RealtimeEvent::Deleted(tombstone) => {
                let guid = tombstone.guid.clone();
                let recorded = self.writer.tombstone(tombstone).await?;
                debug!(%guid, recorded, "realtime delete applied");
                Ok(MergeOutcome::default())
            }
        }
    }

    /// Handles a backup wake signal naming `guid` in `chats`.
    ///
    /// Asks the realtime link to reconnect, then fetches the notified
    /// message unless it is already local or was deleted. A failed
    /// reconnect is logged and does not stop the fetch.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the fetch or the write fails.
    pub async fn on_backup_push(
        &self,
        chats: &ChatSet,
        guid: &MessageGuid,
    ) -> SyncResult<MergeOutcome> {
        info!(%chats, %guid, "backup push received; reconnecting realtime");
        if let Err(err) = self.link.reconnect().await {
            warn!(error = %err, "realtime reconnect failed");
        }

        if self.store.message(guid).await?.is_some() {
            debug!(%guid, "pushed message already local");
            return Ok(MergeOutcome::default());
        }
        if !self.store.tombstoned(std::slice::from_ref(guid)).await?.is_empty() {
            debug!(%guid, "pushed message was deleted");
            return Ok(MergeOutcome::default());
        }

        let found = with_retry(self.config.retry, SyncChannel::BackupPush.as_str(), || {
            self.remote.fetch_message(guid)
        })
        .await?;
        match found {
            Some(batch) => self.writer.merge(batch).await,
            None => {
                debug!(%guid, "pushed message unknown to remote");
                Ok(MergeOutcome::default())
            }
        }
    }

    /// Marks `chats` as the conversation on screen.
    pub async fn view_opened(&self, chats: ChatSet) {
        debug!(%chats, "view opened");
        self.state.lock().await.active_view = Some(chats);
    }

    /// Clears the conversation on screen.
    pub async fn view_closed(&self) {
        if let Some(chats) = self.state.lock().await.active_view.take() {
            debug!(%chats, "view closed");
        }
    }

    /// Returns the conversation on screen, if any.
    pub async fn active_view(&self) -> Option<ChatSet> {
        self.state.lock().await.active_view.clone()
    }

    /// Returns the conversation to poll: the active view, provided the
    /// realtime channel has been silent past the quiet threshold.
    pub async fn poll_target(&self) -> Option<ChatSet> {
        let now = self.now();
        let state = self.state.lock().await;
        if state.health.is_silent(now) {
            state.active_view.clone()
        } else {
            None
        }
    }

    /// Runs one adaptive poll if it is due.
    ///
    /// Fetches everything newer than the newest local message of the active
    /// view. New data counts as channel activity, which stops the poll until
    /// the channel falls silent again. Returns `None` when no poll was due.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the fetch or the write fails.
    pub async fn poll_tick(&self) -> SyncResult<Option<MergeOutcome>> {
        let Some(chats) = self.poll_target().await else {
            return Ok(None);
        };
        let latest = self
            .store
            .summaries(&chats)
            .await?
            .into_iter()
            .filter_map(|summary| summary.latest_at)
            .max();
        let bounds = latest.map_or_else(FetchBounds::latest, FetchBounds::since);
        let outcome = self
            .fetcher()
            .run(WindowFetch {
                chats: &chats,
                bounds,
                limit: self.config.resume_window,
                channel: SyncChannel::Poll,
            })
            .await?;
        if !outcome.inserted.is_empty() {
            let now = self.now();
            self.state.lock().await.health.record(now);
            info!(%chats, inserted = outcome.inserted.len(), "poll found new messages");
        }
        Ok(Some(outcome))
    }

    /// Catches up the active conversation after returning to the
    /// foreground. Returns `None` when no conversation is on screen.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the fetch or the write fails.
    pub async fn resume(&self) -> SyncResult<Option<MergeOutcome>> {
        let Some(chats) = self.active_view().await else {
            return Ok(None);
        };
        info!(%chats, window = self.config.resume_window, "resume sync");
        let outcome = self
            .fetcher()
            .run(WindowFetch {
                chats: &chats,
                bounds: FetchBounds::latest(),
                limit: self.config.resume_window,
                channel: SyncChannel::Resume,
            })
            .await?;
        Ok(Some(outcome))
    }

    /// Refreshes the most recently active chats, each capped to a few
    /// messages. Per-chat failures are logged and skipped. Returns the
    /// number of chats refreshed.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the chat list cannot be read.
    pub async fn periodic_sweep(&self) -> SyncResult<usize> {
        let recent = self.store.recent_chats(self.config.periodic_chat_limit).await?;
        info!(chats = recent.len(), "periodic sweep");
        let mut refreshed = 0_usize;
        for summary in recent {
            let chats = ChatSet::single(summary.chat_id);
            let result = self
                .fetcher()
                .run(WindowFetch {
                    chats: &chats,
                    bounds: FetchBounds::latest(),
                    limit: self.config.periodic_message_cap,
                    channel: SyncChannel::Periodic,
                })
                .await;
            match result {
                Ok(_) => refreshed = refreshed.saturating_add(1),
                Err(err) => warn!(%chats, error = %err, "periodic sync failed"),
            }
        }
        Ok(refreshed)
    }

    /// Forgets every synced interval of `chats`, so the next repair fetches
    /// again instead of trusting earlier coverage.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the write fails.
    pub async fn invalidate_sync_ranges(&self, chats: &ChatSet) -> SyncResult<usize> {
        let removed = self.writer.clear_ranges(chats.clone()).await?;
        info!(%chats, removed, "sync ranges invalidated");
        Ok(removed)
    }

    /// Applies an edit made by the local user.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the write fails.
    pub async fn apply_local_edit(&self, edit: LocalEdit) -> SyncResult<bool> {
        self.writer.local_edit(edit).await
    }
}
