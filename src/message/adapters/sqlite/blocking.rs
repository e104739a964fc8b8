//! Blocking operation helpers for the `SQLite` store.
//!
//! Diesel is synchronous; every query runs on tokio's blocking pool so the
//! async executor's worker threads never wait on disk I/O.

use diesel::SqliteConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};

use crate::message::error::{StoreError, StoreResult};

/// `SQLite` connection pool type.
pub type SqlitePool = Pool<ConnectionManager<SqliteConnection>>;

/// Pooled connection type for internal use.
pub(super) type PooledConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Runs a blocking database operation on a dedicated thread pool.
pub(super) async fn run_blocking<F, T>(f: F) -> StoreResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::connection(format!("task join error: {e}")))?
}

/// Obtains a connection from the pool.
pub(super) fn get_conn(pool: &SqlitePool) -> StoreResult<PooledConn> {
    pool.get().map_err(|e| StoreError::connection(e.to_string()))
}
