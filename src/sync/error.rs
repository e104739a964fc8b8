//! Error types for the sync layer.

use thiserror::Error;

use super::ports::remote::RemoteError;
use crate::message::error::StoreError;

/// Errors raised by sync services.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// The remote call failed after retries.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The local store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The write path has shut down.
    #[error("write path is closed")]
    WriterClosed,
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
