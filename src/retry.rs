//! Timeout and exponential backoff for calls to external services.

use std::future::Future;
use std::time::Duration;

use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{IdiolinkError, Result};

/// Bounded retry with exponential backoff and jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: usize,
    /// Delay before the first retry.
    pub base_delay_ms: u64,
    /// Upper bound for a single delay.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that tries exactly once.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff before retry number `attempt` (1-based), without jitter.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let base = self.base_delay_ms.max(1);
        let exponent = attempt.saturating_sub(1).min(16) as u32;
        let backoff = base.saturating_mul(1u64 << exponent);
        Duration::from_millis(backoff.min(self.max_delay_ms.max(base)))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error or the
    /// attempts are exhausted. Each attempt is bounded by `timeout`.
    pub async fn run<T, F, Fut>(&self, label: &str, timeout: Duration, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(IdiolinkError::timeout(format!(
                    "{label} did not complete within {}ms",
                    timeout.as_millis()
                ))),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    let jitter = rand::rng().random_range(0..=self.base_delay_ms.max(1) / 2);
                    let delay = self.delay_for_attempt(attempt) + Duration::from_millis(jitter);
                    warn!(
                        "{label} failed (attempt {attempt}/{attempts}): {err}; retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
        }
    }

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
        };
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(8), Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result = fast_policy(3)
            .run("flaky", Duration::from_secs(1), || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(IdiolinkError::ranking("503"))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let err = fast_policy(5)
            .run("parse", Duration::from_secs(1), || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(IdiolinkError::refinement_parse("no braces"))
                }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IdiolinkError::RefinementParse(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_exhausts_attempts() {
        let err = fast_policy(2)
            .run("stalled", Duration::from_millis(5), || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, IdiolinkError::Timeout(_)));
    }
}
