//! Store error types.
//!
//! Uses `thiserror` so callers can match on the failure class.

use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a [`MessageStore`](crate::message::ports::store::MessageStore).
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The database rejected or failed a query.
    #[error("database error: {0}")]
    Database(Arc<dyn std::error::Error + Send + Sync>),

    /// A stored value could not be converted to or from its domain form.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The store could not be reached (pool exhausted, lock poisoned, task
    /// aborted).
    #[error("connection error: {0}")]
    Connection(String),
}

impl StoreError {
    /// Creates a database error from any error type.
    #[must_use]
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Database(Arc::new(err))
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(err: diesel::result::Error) -> Self {
        Self::database(err)
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
