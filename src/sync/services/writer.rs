//! The single serialized write path into the store.
//!
//! Every sync channel and every local action hands its mutation to one
//! actor task, which applies them one at a time in arrival order. Readers
//! therefore never observe a half-applied batch from two channels at once.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::message::domain::{ChatSet, MessageBatch, SyncRange, Tombstone};
use crate::message::error::StoreResult;
use crate::message::ports::store::{LocalEdit, MergeOutcome, MessageStore};
use crate::sync::error::{SyncError, SyncResult};

const QUEUE_DEPTH: usize = 64;

enum WriteCommand {
    Merge {
        batch: MessageBatch,
        respond_to: oneshot::Sender<StoreResult<MergeOutcome>>,
    },
    Tombstone {
        tombstone: Tombstone,
        respond_to: oneshot::Sender<StoreResult<bool>>,
    },
    LocalEdit {
        edit: LocalEdit,
        respond_to: oneshot::Sender<StoreResult<bool>>,
    },
    RecordRange {
        range: SyncRange,
        respond_to: oneshot::Sender<StoreResult<()>>,
    },
    ClearRanges {
        chats: ChatSet,
        respond_to: oneshot::Sender<StoreResult<usize>>,
    },
}

/// Sending half of the write path. Cheap to clone.
#[derive(Debug, Clone)]
pub struct WritePath {
    sender: mpsc::Sender<WriteCommand>,
}

impl std::fmt::Debug for WriteCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Merge { .. } => "Merge",
            Self::Tombstone { .. } => "Tombstone",
            Self::LocalEdit { .. } => "LocalEdit",
            Self::RecordRange { .. } => "RecordRange",
            Self::ClearRanges { .. } => "ClearRanges",
        };
        f.write_str(name)
    }
}

impl WritePath {
    /// Spawns the writer task over `store`.
    ///
    /// The task exits once every [`WritePath`] clone has been dropped.
    #[must_use]
    pub fn spawn<S>(store: Arc<S>) -> (Self, JoinHandle<()>)
    where
        S: MessageStore + ?Sized + 'static,
    {
        let (sender, receiver) = mpsc::channel(QUEUE_DEPTH);
        let task = tokio::spawn(run(store, receiver));
        (Self { sender }, task)
    }

    /// Merges a batch of remote rows.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Store` if the write fails, or
    /// `SyncError::WriterClosed` if the writer has stopped.
    pub async fn merge(&self, batch: MessageBatch) -> SyncResult<MergeOutcome> {
        self.request(|respond_to| WriteCommand::Merge { batch, respond_to })
            .await
    }

    /// Records a tombstone.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Store` if the write fails, or
    /// `SyncError::WriterClosed` if the writer has stopped.
    pub async fn tombstone(&self, tombstone: Tombstone) -> SyncResult<bool> {
        self.request(|respond_to| WriteCommand::Tombstone {
            tombstone,
            respond_to,
        })
        .await
    }

    /// Applies a local edit.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Store` if the write fails, or
    /// `SyncError::WriterClosed` if the writer has stopped.
    pub async fn local_edit(&self, edit: LocalEdit) -> SyncResult<bool> {
        self.request(|respond_to| WriteCommand::LocalEdit { edit, respond_to })
            .await
    }

    /// Records a synced interval.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Store` if the write fails, or
    /// `SyncError::WriterClosed` if the writer has stopped.
    pub async fn record_range(&self, range: SyncRange) -> SyncResult<()> {
        self.request(|respond_to| WriteCommand::RecordRange { range, respond_to })
            .await
    }

    /// Drops every sync range of `chats`.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Store` if the write fails, or
    /// `SyncError::WriterClosed` if the writer has stopped.
    pub async fn clear_ranges(&self, chats: ChatSet) -> SyncResult<usize> {
        self.request(|respond_to| WriteCommand::ClearRanges { chats, respond_to })
            .await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<StoreResult<T>>) -> WriteCommand,
    ) -> SyncResult<T> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(command(respond_to))
            .await
            .map_err(|_| SyncError::WriterClosed)?;
        let result = response.await.map_err(|_| SyncError::WriterClosed)?;
        Ok(result?)
    }
}

async fn run<S>(store: Arc<S>, mut receiver: mpsc::Receiver<WriteCommand>)
where
    S: MessageStore + ?Sized,
{
    while let Some(command) = receiver.recv().await {
        debug!(?command, "applying write");
        match command {
            WriteCommand::Merge { batch, respond_to } => {
                respond(respond_to, store.merge(batch).await);
            }
            WriteCommand::Tombstone {
                tombstone,
                respond_to,
            } => respond(respond_to, store.record_tombstone(tombstone).await),
            WriteCommand::LocalEdit { edit, respond_to } => {
                respond(respond_to, store.apply_local_edit(edit).await);
            }
            WriteCommand::RecordRange { range, respond_to } => {
                respond(respond_to, store.record_sync_range(range).await);
            }
            WriteCommand::ClearRanges { chats, respond_to } => {
                respond(respond_to, store.clear_sync_ranges(&chats).await);
            }
        }
    }
    debug!("write path closed");
}

fn respond<T>(respond_to: oneshot::Sender<StoreResult<T>>, result: StoreResult<T>) {
    if let Err(Err(err)) = respond_to.send(result) {
        warn!(error = %err, "write failed after its caller went away");
    }
}
