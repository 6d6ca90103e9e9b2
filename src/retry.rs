//! Shared exponential-backoff retry helper, reused by descriptor
//! extraction and generator adapters rather than duplicated per call site
//! (§9 Design Notes). Grounded on `mcp/client.rs`'s `retry_operation`.

use std::future::Future;
use std::time::Duration;

/// Retry `operation` up to `max_attempts` times, sleeping
/// `base * factor^attempt` between attempts. `is_retryable` decides
/// whether a given error should be retried at all; non-retryable errors
/// return immediately.
pub async fn retry_with_backoff<F, Fut, T, E>(
    base: Duration,
    factor: u32,
    max_attempts: u32,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut last_err = None;
    for attempt in 0..max_attempts {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retryable(&err) {
                    return Err(err);
                }
                last_err = Some(err);
            }
        }

        if attempt + 1 < max_attempts {
            let wait = base * factor.pow(attempt);
            tokio::time::sleep(wait).await;
        }
    }

    Err(last_err.expect("loop runs at least once"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success_within_max_attempts() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(
            Duration::from_millis(1),
            2,
            3,
            |_: &&str| true,
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("transient")
                    } else {
                        Ok(n)
                    }
                }
            },
        )
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_immediately_on_non_retryable_error() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(
            Duration::from_millis(1),
            2,
            5,
            |_: &&str| false,
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("fatal") }
            },
        )
        .await;

        assert_eq!(result, Err("fatal"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_all_attempts_and_returns_last_error() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_backoff(
            Duration::from_millis(1),
            2,
            3,
            |_: &&str| true,
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("still failing") }
            },
        )
        .await;

        assert_eq!(result, Err("still failing"));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
