//! Control port for the realtime connection.

use async_trait::async_trait;

use super::remote::RemoteResult;

/// Handle on the persistent realtime connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RealtimeLink: Send + Sync {
    /// Tears down and re-establishes the connection.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the connection cannot be re-established.
    async fn reconnect(&self) -> RemoteResult<()>;
}
