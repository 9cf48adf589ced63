//! Category-driven retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use telemetry_types::{ErrorCategory, ExtractError};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_INTERVAL: Duration = Duration::from_millis(1_000);
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_millis(60_000);

/// Categories retried unless the configuration says otherwise.
pub const DEFAULT_RETRY_ON: [ErrorCategory; 4] = [
    ErrorCategory::TransientNetwork,
    ErrorCategory::TransientDb,
    ErrorCategory::Transfer,
    ErrorCategory::Io,
];

/// Delay before attempt `attempt + 1`: `base * 2^(attempt-1)`, capped at `max`.
#[must_use]
pub fn compute_backoff(base: Duration, max: Duration, attempt: u32) -> Duration {
    let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    let factor = 2u64.checked_pow(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
    Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub base_interval: Duration,
    pub max_interval: Duration,
    pub retry_on: Vec<ErrorCategory>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_interval: DEFAULT_BASE_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            retry_on: DEFAULT_RETRY_ON.to_vec(),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn should_retry(&self, err: &ExtractError) -> bool {
        self.retry_on.contains(&err.category)
    }

    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        compute_backoff(self.base_interval, self.max_interval, attempt)
    }

    /// Run `op` until it succeeds, fails with a category outside the
    /// allow-list, or runs out of attempts. The last error is returned.
    ///
    /// # Errors
    ///
    /// Returns the error of the final attempt.
    pub async fn call<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, ExtractError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExtractError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(operation, attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if self.should_retry(&err) && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms,
                        category = %err.category,
                        code = %err.code,
                        "Retryable error, will retry: {}",
                        err.message
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if self.should_retry(&err) {
                        tracing::error!(
                            operation,
                            attempt,
                            category = %err.category,
                            code = %err.code,
                            "Max attempts exhausted"
                        );
                    } else {
                        tracing::error!(
                            operation,
                            category = %err.category,
                            code = %err.code,
                            "Non-retryable error"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}
