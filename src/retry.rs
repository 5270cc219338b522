use std::future::Future;

use backon::Retryable;

use crate::config::BackoffConfig;
use crate::errors::{Error, Result};

/// Runs `op` until it succeeds or exhausts the backoff schedule.
/// Only transient errors (connection trouble and server-side transient
/// failures) are retried; everything else surfaces on the first attempt.
pub async fn with_retry<T, F, Fut>(op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    with_retry_using(&BackoffConfig::default(), op).await
}

/// As [`with_retry`] with explicit backoff settings.
pub async fn with_retry_using<T, F, Fut>(backoff: &BackoffConfig, op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    op.retry(backoff.to_exponential_builder())
        .when(Error::is_transient)
        .await
}
