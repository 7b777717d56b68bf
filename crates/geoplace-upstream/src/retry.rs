//! Transport-level retry with exponential back-off and jitter.
//!
//! This is the only retry in the system. The engine never retries a failed
//! upstream call; it only widens the radius after a successful but
//! insufficient one.

use std::future::Future;
use std::time::Duration;

use crate::error::UpstreamError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:** timeouts, connection failures, HTTP 429 and 5xx.
///
/// **Not retriable:** any other status (the request itself is wrong),
/// unreadable bodies, and a missing configuration.
pub(crate) fn is_retriable(err: &UpstreamError) -> bool {
    match err {
        UpstreamError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        UpstreamError::Status { status, .. } => *status == 429 || *status >= 500,
        UpstreamError::Timeout(_) => true,
        UpstreamError::NotConfigured(_) | UpstreamError::Deserialize { .. } => false,
    }
}

/// Longest sleep between two attempts, before jitter.
const MAX_DELAY: Duration = Duration::from_secs(10);

/// Delay before retry number `retry` (1-based): `base_ms × 2^(retry-1)`,
/// capped at [`MAX_DELAY`], then scaled by `jitter` in `[0.75, 1.25)`.
fn backoff_delay(retry: u32, base_ms: u64, jitter: f64) -> Duration {
    let doubled = base_ms.saturating_mul(1u64 << retry.saturating_sub(1).min(10));
    let capped = Duration::from_millis(doubled).min(MAX_DELAY);
    capped.mul_f64(jitter.clamp(0.75, 1.25))
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// retriable errors. Anything else is returned from the first attempt.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let mut retries = 0u32;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retriable(&err) && retries < max_retries => err,
            Err(err) => return Err(err),
        };
        retries += 1;
        let delay = backoff_delay(retries, backoff_base_ms, 0.75 + rand::random::<f64>() / 2.0);
        tracing::warn!(
            retry = retries,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "places upstream call failed, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn status_err(status: u16) -> UpstreamError {
        UpstreamError::Status {
            status,
            code: "X".to_owned(),
            message: "x".to_owned(),
        }
    }

    #[test]
    fn validation_status_is_not_retriable() {
        assert!(!is_retriable(&status_err(400)));
        assert!(!is_retriable(&status_err(404)));
    }

    #[test]
    fn throttling_and_server_status_are_retriable() {
        assert!(is_retriable(&status_err(429)));
        assert!(is_retriable(&status_err(500)));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        assert_eq!(backoff_delay(1, 500, 1.0), Duration::from_millis(500));
        assert_eq!(backoff_delay(3, 500, 1.0), Duration::from_millis(2000));
        assert_eq!(backoff_delay(9, 500, 1.0), MAX_DELAY);
        assert_eq!(backoff_delay(1, 1000, 0.75), Duration::from_millis(750));
    }

    #[test]
    fn not_configured_is_not_retriable() {
        assert!(!is_retriable(&UpstreamError::NotConfigured(
            "missing key".to_owned()
        )));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, UpstreamError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err(status_err(503))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(status_err(500))
            }
        })
        .await;
        assert!(matches!(
            result,
            Err(UpstreamError::Status { status: 500, .. })
        ));
        assert_eq!(
            calls.load(Ordering::SeqCst),
            3,
            "one initial attempt plus two retries"
        );
    }

    #[tokio::test]
    async fn does_not_retry_rejections() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(status_err(400))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "400 must not be retried");
        assert!(result.is_err());
    }
}
