use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::{RetryDecision, RetryPolicy};
use std::future::Future;
use std::time::{Duration, SystemTime};

use crate::core::Result;

/// Backoff used for read-only gateway calls
pub fn backoff_policy(max_retries: u32) -> ExponentialBackoff {
    ExponentialBackoff::builder()
        .retry_bounds(Duration::from_millis(200), Duration::from_secs(5))
        .build_with_max_retries(max_retries)
}

/// Run `call` until it succeeds, fails with a non-retryable error, or the
/// policy gives up. Only use for operations that are safe to repeat.
pub async fn with_retry<T, F, Fut>(
    policy: &ExponentialBackoff,
    operation: &str,
    mut call: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = SystemTime::now();
    let mut past_retries: u32 = 0;

    loop {
        let err = match call().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => err,
            Err(err) => return Err(err),
        };

        match policy.should_retry(started, past_retries) {
            RetryDecision::Retry { execute_after } => {
                let delay = execute_after
                    .duration_since(SystemTime::now())
                    .unwrap_or_default();
                past_retries += 1;

                tracing::warn!(
                    operation = operation,
                    attempt = past_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying gateway call"
                );

                tokio::time::sleep(delay).await;
            }
            RetryDecision::DoNotRetry => {
                tracing::error!(
                    operation = operation,
                    attempts = past_retries + 1,
                    error = %err,
                    "Gateway call failed after retries"
                );
                return Err(err);
            }
        }
    }
}
