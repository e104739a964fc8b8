//! Remote fetch port.

use async_trait::async_trait;
use thiserror::Error;

use crate::message::domain::{ChatSet, MessageBatch, MessageGuid, Timestamp};

/// Errors raised by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The server could not be reached.
    #[error("remote unavailable: {0}")]
    Unavailable(String),

    /// The request timed out.
    #[error("remote request timed out")]
    Timeout,

    /// The server answered with something unusable.
    #[error("remote protocol error: {0}")]
    Protocol(String),
}

impl RemoteError {
    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Returns `true` if retrying the call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout)
    }
}

/// Result type for remote calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Inclusive timestamp bounds of a window fetch. `None` is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchBounds {
    /// Oldest instant wanted.
    pub after: Option<Timestamp>,
    /// Newest instant wanted.
    pub before: Option<Timestamp>,
}

impl FetchBounds {
    /// The most recent messages.
    #[must_use]
    pub const fn latest() -> Self {
        Self {
            after: None,
            before: None,
        }
    }

    /// Messages at or after `after`.
    #[must_use]
    pub const fn since(after: Timestamp) -> Self {
        Self {
            after: Some(after),
            before: None,
        }
    }

    /// Messages within `[after, before]`.
    #[must_use]
    pub const fn between(after: Option<Timestamp>, before: Option<Timestamp>) -> Self {
        Self { after, before }
    }

    /// Returns `true` if `at` lies within the bounds.
    #[must_use]
    pub fn contains(&self, at: Timestamp) -> bool {
        self.after.is_none_or(|after| at >= after) && self.before.is_none_or(|before| at <= before)
    }

    /// Returns the interval a fetch has proven complete.
    ///
    /// A fetch that came back short of its limit covers the whole bounds.
    /// A full fetch only covers the part newer than its oldest row; rows
    /// sharing that instant may have been cut off.
    ///
    /// # Examples
    ///
    /// ```
    /// use scrollback::message::domain::Timestamp;
    /// use scrollback::sync::ports::remote::FetchBounds;
    ///
    /// let at = Timestamp::from_millis;
    /// let bounds = FetchBounds::between(Some(at(10)), None);
    ///
    /// assert_eq!(bounds.covered(Some(at(40)), true, at(100)), Some((at(10), at(100))));
    /// assert_eq!(bounds.covered(Some(at(40)), false, at(100)), Some((at(41), at(100))));
    /// assert_eq!(bounds.covered(None, false, at(100)), None);
    /// ```
    #[must_use]
    pub fn covered(
        &self,
        oldest: Option<Timestamp>,
        exhausted: bool,
        now: Timestamp,
    ) -> Option<(Timestamp, Timestamp)> {
        let end = self.before.unwrap_or(now);
        let start = if exhausted {
            self.after.unwrap_or(Timestamp::MIN)
        } else {
            Timestamp::from_millis(oldest?.as_millis().saturating_add(1))
        };
        (start <= end).then_some((start, end))
    }
}

/// Fetches raw rows from the server.
///
/// Both calls return rows for the write path to merge; neither touches the
/// local store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetches up to `limit` messages of `chats` within `bounds`, newest
    /// first, with their attachments, roster and remote totals.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the request fails.
    async fn fetch_window(
        &self,
        chats: &ChatSet,
        bounds: FetchBounds,
        limit: u64,
    ) -> RemoteResult<MessageBatch>;

    /// Fetches one message with its attachments. `None` if the server does
    /// not know it.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError` if the request fails.
    async fn fetch_message(&self, guid: &MessageGuid) -> RemoteResult<Option<MessageBatch>>;
}
