//! Retry with exponential backoff for remote calls.

use std::future::Future;

use tracing::warn;

use crate::sync::config::RetryPolicy;
use crate::sync::ports::RemoteResult;

/// Runs `call` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts.
///
/// # Errors
///
/// Returns the last `RemoteError` seen.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, operation: &str, mut call: F) -> RemoteResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RemoteResult<T>>,
{
    let mut delays = policy.delays();
    let mut attempt: u32 = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => {
                let Some(delay) = delays.next() else {
                    warn!(operation, attempt, error = %err, "remote call failed, giving up");
                    return Err(err);
                };
                warn!(
                    operation,
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "remote call failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt = attempt.saturating_add(1);
            }
            Err(err) => {
                warn!(operation, error = %err, "remote call failed");
                return Err(err);
            }
        }
    }
}
