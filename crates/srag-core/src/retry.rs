//! Timeout and bounded retry for remote calls

use std::future::Future;

use tokio::time::{sleep, timeout};

use crate::types::RetryConfig;
use crate::{Error, Result};

/// Run `operation` with a per-attempt timeout, retrying transient failures.
///
/// Each attempt is bounded by `config.request_timeout`. Errors for which
/// [`Error::is_retryable`] is false are returned immediately.
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, label: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = match timeout(config.request_timeout, operation()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(format!(
                "{} did not finish within {:?}",
                label, config.request_timeout
            ))),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = config.backoff(attempt);
                tracing::warn!(
                    operation = label,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "remote call failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
