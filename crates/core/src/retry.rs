//! Bounded retry with per-attempt timeouts for outbound calls.
//!
//! Every call to an external service goes through a [`RetryPolicy`]: each
//! attempt is wrapped in `tokio::time::timeout`, a transient failure earns at
//! most one more attempt after a backoff, and anything else is returned as-is.
//! Timeout expiry is reported through the caller's own error type so the
//! failure kind survives.

use crate::error::{CatalogError, ProviderError};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Hard ceiling on attempts for any outbound call (one try plus one retry).
pub const MAX_ATTEMPTS: u32 = 2;

/// Errors that know whether another attempt could help.
pub trait Retryable: std::error::Error + Sized {
    /// Whether the failure is likely to clear on its own.
    fn is_transient(&self) -> bool;

    /// The error to report when an attempt outlives its timeout.
    fn timed_out(label: &str, after: Duration) -> Self;
}

impl Retryable for ProviderError {
    fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationFailed(_) | Self::NotConfigured(_) => false,
        }
    }

    fn timed_out(label: &str, after: Duration) -> Self {
        Self::Timeout(format!("{label} timed out after {}ms", after.as_millis()))
    }
}

impl Retryable for CatalogError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Throttled(_) | Self::Timeout(_) | Self::Network(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationFailed(_)
            | Self::NotConfigured(_)
            | Self::MalformedResponse(_)
            | Self::PaginationLoop(_) => false,
        }
    }

    fn timed_out(label: &str, after: Duration) -> Self {
        Self::Timeout(format!("{label} timed out after {}ms", after.as_millis()))
    }
}

/// How an outbound call is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
    timeout: Duration,
}

impl RetryPolicy {
    /// Create a policy. `max_attempts` is clamped to `1..=MAX_ATTEMPTS`.
    pub fn new(max_attempts: u32, backoff: Duration, timeout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.clamp(1, MAX_ATTEMPTS),
            backoff,
            timeout,
        }
    }

    /// A single attempt with the given timeout.
    pub fn once(timeout: Duration) -> Self {
        Self::new(1, Duration::ZERO, timeout)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `op` under this policy.
    ///
    /// `op` is invoked once per attempt; dropping the returned future cancels
    /// whichever attempt is in flight.
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, E>
    where
        E: Retryable,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            debug!(call = label, attempt, max = self.max_attempts, "Outbound call");

            let error = match tokio::time::timeout(self.timeout, op()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(e)) => e,
                Err(_) => E::timed_out(label, self.timeout),
            };

            if attempt >= self.max_attempts || !error.is_transient() {
                return Err(error);
            }

            warn!(
                call = label,
                attempt,
                error = %error,
                backoff_ms = self.backoff.as_millis() as u64,
                "Transient failure, retrying"
            );
            tokio::time::sleep(self.backoff).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(MAX_ATTEMPTS, Duration::from_millis(500), Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_millis(100), Duration::from_secs(1))
    }

    #[test]
    fn attempts_are_clamped() {
        assert_eq!(RetryPolicy::new(10, Duration::ZERO, Duration::ZERO).max_attempts(), 2);
        assert_eq!(RetryPolicy::new(0, Duration::ZERO, Duration::ZERO).max_attempts(), 1);
    }

    #[test]
    fn transient_classification() {
        assert!(ProviderError::Network("reset".into()).is_transient());
        assert!(!ProviderError::AuthenticationFailed("bad key".into()).is_transient());
        assert!(
            ProviderError::ApiError {
                status_code: 502,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !CatalogError::ApiError {
                status_code: 400,
                message: String::new()
            }
            .is_transient()
        );
        assert!(CatalogError::Throttled("slow down".into()).is_transient());
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_first_attempt() {
        let calls = AtomicUsize::new(0);
        let result: Result<u32, ProviderError> = policy()
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failure_once() {
        let calls = AtomicUsize::new(0);
        let result: Result<&str, CatalogError> = policy()
            .run("test", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(CatalogError::Network("connection reset".into()))
                } else {
                    Ok("page")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "page");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_budget() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), ProviderError> = policy()
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ProviderError::Network("down".into()))
            })
            .await;
        assert!(matches!(result, Err(ProviderError::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_is_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), CatalogError> = policy()
            .run("test", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CatalogError::AuthenticationFailed("signature mismatch".into()))
            })
            .await;
        assert!(matches!(result, Err(CatalogError::AuthenticationFailed(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_call_times_out_with_callers_error_type() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), CatalogError> = policy()
            .run("GetProducts", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
            .await;
        match result {
            Err(CatalogError::Timeout(msg)) => assert!(msg.contains("GetProducts")),
            other => panic!("Expected Timeout, got: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
