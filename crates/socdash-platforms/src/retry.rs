//! Retry with exponential back-off and jitter for upstream platform calls.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (network failures, 5xx, 429). Everything else is returned
//! immediately.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;

use crate::error::PlatformError;

/// Returns `true` for errors that are worth retrying after a back-off delay.
///
/// **Retriable:**
/// - Network-level failures: timeout, connection reset.
/// - HTTP 5xx responses and HTTP 429 (rate limited upstream).
///
/// **Not retriable:** API-level errors reported in the body, other 4xx
/// statuses, malformed payloads, and local configuration problems.
pub(crate) fn is_retriable(err: &PlatformError) -> bool {
    match err {
        PlatformError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.status().is_some_and(|s| {
                    s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS
                })
        }
        PlatformError::Status { status, .. } => {
            status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
        }
        PlatformError::Api { .. }
        | PlatformError::Deserialize { .. }
        | PlatformError::NoPage
        | PlatformError::NoChannel
        | PlatformError::NoLinkedAccount
        | PlatformError::MissingCredential(_)
        | PlatformError::Unsupported { .. }
        | PlatformError::OAuth(_)
        | PlatformError::InvalidUrl { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// Back-off schedule with `backoff_base_ms = 500`:
///
/// | Attempt | Sleep before next attempt     |
/// |---------|-------------------------------|
/// | 1       | 500 ms × 2⁰ ± 25 % jitter     |
/// | 2       | 500 ms × 2¹ ± 25 % jitter     |
/// | 3       | 500 ms × 2² ± 25 % jitter     |
///
/// Delay is capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, PlatformError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, PlatformError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient upstream error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use socdash_core::Platform;

    use super::*;

    fn status_err(status: StatusCode) -> PlatformError {
        PlatformError::Status {
            platform: Platform::Tiktok,
            status,
            message: "upstream".to_owned(),
        }
    }

    #[test]
    fn server_errors_and_throttling_are_retriable() {
        assert!(is_retriable(&status_err(StatusCode::BAD_GATEWAY)));
        assert!(is_retriable(&status_err(StatusCode::TOO_MANY_REQUESTS)));
    }

    #[test]
    fn client_errors_are_not_retriable() {
        assert!(!is_retriable(&status_err(StatusCode::UNAUTHORIZED)));
        assert!(!is_retriable(&status_err(StatusCode::NOT_FOUND)));
    }

    #[test]
    fn api_and_decode_errors_are_not_retriable() {
        assert!(!is_retriable(&PlatformError::Api {
            platform: Platform::Tiktok,
            message: "user not found".to_owned(),
        }));
        let src = serde_json::from_str::<()>("invalid").unwrap_err();
        assert!(!is_retriable(&PlatformError::Deserialize {
            context: "test".to_owned(),
            source: src,
        }));
        assert!(!is_retriable(&PlatformError::NoPage));
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, PlatformError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(status_err(StatusCode::FORBIDDEN))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "403 must not be retried");
        assert!(matches!(result, Err(PlatformError::Status { .. })));
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err::<u32, _>(status_err(StatusCode::SERVICE_UNAVAILABLE))
                } else {
                    Ok(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99, "should succeed after retries");
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
                Err::<u32, _>(status_err(StatusCode::INTERNAL_SERVER_ERROR))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(
            calls.load(Ordering::SeqCst),
            3,
            "one initial attempt plus two retries"
        );
    }
}
