use std::{future::Future, time::Duration};
use tracing::{error, warn};
use trellis_core::Result;

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            exponential_base: 2.0,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    #[must_use]
    pub fn with_exponential_base(mut self, exponential_base: f64) -> Self {
        self.exponential_base = exponential_base;
        self
    }

    /// Backoff delay before the attempt following `attempt` (zero-based).
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = self.exponential_base.max(1.0).powi(attempt as i32);
        let scaled = Duration::from_secs_f64(self.base_delay.as_secs_f64() * factor);
        scaled.min(self.max_delay)
    }
}

/// Runs `operation` up to `policy.max_attempts` times with exponential backoff.
///
/// Non-retriable errors propagate immediately. A rate-limit error carrying a
/// server-suggested wait uses that wait (capped at `max_delay`) instead of the
/// computed backoff. The error from the final attempt is returned unwrapped.
pub async fn with_retry<T, Op, Fut>(policy: &RetryPolicy, mut operation: Op) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retriable() {
                    warn!(error = %err, "non-retriable error, not retrying");
                    return Err(err);
                }

                attempt += 1;
                if attempt >= max_attempts {
                    error!(
                        attempts = max_attempts,
                        error = %err,
                        "all retry attempts failed"
                    );
                    return Err(err);
                }

                let delay = match err.retry_after() {
                    Some(after) => after.min(policy.max_delay),
                    None => policy.backoff_delay(attempt - 1),
                };
                warn!(
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
