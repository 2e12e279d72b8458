//! Managed retry.
//!
//! The single entry point for automatic retry. Each call runs its own loop;
//! nothing is shared between concurrent callers. Sleeping is a tokio timer,
//! never a blocking sleep.

use crate::backoff::delay_for;
use crate::error::{ExecResult, GraphError};
use cypherbridge_config::RetryConfig;
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the attempt budget is spent. The last error carries the attempt count.
pub async fn with_managed_retry<F, Fut, T>(operation: F, config: &RetryConfig) -> ExecResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ExecResult<T>>,
{
    with_managed_retry_cancellable(operation, config, &CancellationToken::new()).await
}

/// [`with_managed_retry`] that stops when `cancel` fires.
///
/// Cancellation is checked before every attempt and raced against every
/// backoff sleep. It surfaces as [`GraphError::Cancelled`].
pub async fn with_managed_retry_cancellable<F, Fut, T>(
    mut operation: F,
    config: &RetryConfig,
    cancel: &CancellationToken,
) -> ExecResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ExecResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        if cancel.is_cancelled() {
            debug!("Cancelled before attempt {}", attempt);
            return Err(GraphError::Cancelled { attempt });
        }

        debug!("Attempt {} of {}", attempt, max_attempts);
        let error = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!("Operation succeeded on attempt {}", attempt);
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !error.is_retryable() {
            error!("Attempt {} failed with non-retryable error: {}", attempt, error);
            return Err(error.with_attempts(attempt));
        }

        if attempt >= max_attempts {
            error!("All {} attempts failed, last error: {}", max_attempts, error);
            return Err(error.with_attempts(attempt));
        }

        let delay = delay_for(attempt, config);
        warn!(
            "Attempt {} failed ({}), retrying in {:?}",
            attempt, error, delay
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Cancelled during backoff after attempt {}", attempt);
                return Err(GraphError::Cancelled { attempt: attempt + 1 });
            }
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
