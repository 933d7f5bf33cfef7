use std::future::Future;
use std::time::Duration;

/// Reusable retry schedule for calls to external services.
///
/// Backoff is exponential: attempt `n` (zero-based) waits
/// `base_delay * 2^n` before the next try. Only errors the provided
/// predicate classifies as transient are retried; everything else surfaces
/// immediately.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Default schedule for oracle calls: 3 attempts, 2s base backoff.
    pub fn oracle_default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }

    pub async fn run<T, E, F, Fut, P>(&self, label: &str, mut op: F, is_transient: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 < self.max_attempts && is_transient(&err) => {
                    let wait = self.delay_for_attempt(attempt);
                    log::warn!(
                        "{label}: attempt {} failed ({err}), retrying in {:?}",
                        attempt + 1,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OracleError;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(0))
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = AtomicU32::new(0);
        let out = instant_policy(3)
            .run(
                "test",
                || {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n < 2 {
                            Err(OracleError::Transient("flaky".into()))
                        } else {
                            Ok("ok")
                        }
                    }
                },
                OracleError::is_transient,
            )
            .await;
        assert_eq!(out.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_abort_immediately() {
        let calls = AtomicU32::new(0);
        let out: Result<(), _> = instant_policy(3)
            .run(
                "test",
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(OracleError::Fatal("nope".into())) }
                },
                OracleError::is_transient,
            )
            .await;
        assert!(matches!(out, Err(OracleError::Fatal(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_retries_return_last_error() {
        let calls = AtomicU32::new(0);
        let out: Result<(), _> = instant_policy(3)
            .run(
                "test",
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err(OracleError::RateLimited("429".into())) }
                },
                OracleError::is_transient,
            )
            .await;
        assert!(matches!(out, Err(OracleError::RateLimited(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn backoff_is_exponential() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(8));
    }
}
