use std::{future::Future, time::Duration};
use tracing::error;
use trellis_core::{Result, TrellisError};

/// Bounds `future` by `timeout`, cancelling it at the await point on expiry.
///
/// A timed-out operation surfaces as [`TrellisError::AgentTimeout`] tagged
/// with `operation` so callers can tell which step blew its deadline.
pub async fn with_timeout<T, F>(operation: &str, timeout: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => {
            error!(
                operation = operation,
                timeout_ms = timeout.as_millis() as u64,
                "operation timed out"
            );
            Err(TrellisError::AgentTimeout {
                operation: operation.to_string(),
                timeout,
            })
        }
    }
}
