use portkey_core::StorageError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;

/// Bounded exponential backoff for storage writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct RetryPolicy {
    /// Total number of tries, the first one included.
    #[builder(default = 5)]
    pub max_attempts: u32,
    #[builder(default = Duration::from_millis(50))]
    pub base_delay: Duration,
    #[builder(default = Duration::from_secs(2))]
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based), without jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1 << exponent)
            .min(self.max_delay)
    }

    /// [`backoff`](Self::backoff) plus up to 25% random jitter, still capped.
    fn jittered_backoff(&self, retry: u32) -> Duration {
        let delay = self.backoff(retry);
        let jitter_ms = (delay.as_millis() as u64) / 4;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        (delay + jitter).min(self.max_delay)
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the policy runs out.
///
/// Only errors for which [`StorageError::is_transient`] holds are retried.
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = operation_name, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_transient() && attempt < max_attempts => {
                let delay = policy.jittered_backoff(attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    error = %err,
                    delay_ms = delay.as_millis() as u64,
                    "storage write failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
