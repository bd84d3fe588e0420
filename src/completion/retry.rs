//! Shared exponential backoff retry logic for completion backend calls.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;

/// Configuration: 3 total attempts, base 1s, max 30s.
pub const MAX_ATTEMPTS: u32 = 3;
const INITIAL_INTERVAL_SECS: u64 = 1;
const MAX_INTERVAL_SECS: u64 = 30;

/// Retry an async operation with exponential backoff.
///
/// `attempt` is called up to [`MAX_ATTEMPTS`] times. `should_retry`
/// classifies errors: a non-retryable error (malformed model output, bad
/// template) is returned immediately, while transport-level failures sleep
/// for an exponentially increasing duration and try again.
///
/// `wrap_exhausted` converts the last error into the caller's
/// retries-exhausted variant.
pub async fn retry_with_backoff<T, E, Fut, F, P, W>(
    mut attempt: F,
    should_retry: P,
    wrap_exhausted: W,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    W: FnOnce(E) -> E,
{
    let mut backoff = ExponentialBackoff {
        initial_interval: Duration::from_secs(INITIAL_INTERVAL_SECS),
        max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        max_elapsed_time: None,
        ..Default::default()
    };

    let mut attempts = 0;
    let mut last_error = None;

    while attempts < MAX_ATTEMPTS {
        attempts += 1;

        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !should_retry(&e) {
                    return Err(e);
                }
                last_error = Some(e);

                if attempts < MAX_ATTEMPTS
                    && let Some(wait_duration) = backoff.next_backoff()
                {
                    tokio::time::sleep(wait_duration).await;
                }
            }
        }
    }

    Err(wrap_exhausted(
        last_error.expect("last_error should be Some after failed retries"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Transient,
        Fatal,
        RetriesExhausted(Box<TestError>),
    }

    fn retryable(e: &TestError) -> bool {
        matches!(e, TestError::Transient)
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_first_attempt() {
        let result: Result<&str, TestError> = retry_with_backoff(
            || async { Ok("ok") },
            retryable,
            |e| TestError::RetriesExhausted(Box::new(e)),
        )
        .await;
        assert_eq!(result.unwrap(), "ok");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_attempts() {
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = count.clone();

        let result: Result<(), TestError> = retry_with_backoff(
            move || {
                let c = count_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Transient)
                }
            },
            retryable,
            |e| TestError::RetriesExhausted(Box::new(e)),
        )
        .await;

        assert!(matches!(result, Err(TestError::RetriesExhausted(_))));
        assert_eq!(count.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_errors_are_not_retried() {
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = count.clone();

        let result: Result<(), TestError> = retry_with_backoff(
            move || {
                let c = count_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Fatal)
                }
            },
            retryable,
            |e| TestError::RetriesExhausted(Box::new(e)),
        )
        .await;

        assert_eq!(result, Err(TestError::Fatal));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let count = Arc::new(AtomicU32::new(0));
        let count_clone = count.clone();

        let result: Result<&str, TestError> = retry_with_backoff(
            move || {
                let c = count_clone.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(TestError::Transient)
                    } else {
                        Ok("recovered")
                    }
                }
            },
            retryable,
            |e| TestError::RetriesExhausted(Box::new(e)),
        )
        .await;

        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
