//! Reusable retry policy
//!
//! A policy is `{max_attempts, backoff(attempt), is_retryable(error)}`. Uploads apply
//! it directly; processing relies on queue redelivery instead and only uses the
//! classification half.

use std::future::Future;
use std::time::Duration;

/// Errors that know whether another attempt can succeed.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Delay curve between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `attempt * base`
    Linear { base: Duration },
    /// `base * 2^(attempt - 1)`, capped at `max`
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        match *self {
            Backoff::Linear { base } => base.saturating_mul(attempt),
            Backoff::Exponential { base, max } => {
                let factor = 2_u32.saturating_pow(attempt - 1);
                base.saturating_mul(factor).min(max)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::Linear {
                base: Duration::from_millis(500),
            },
        }
    }
}

impl RetryPolicy {
    pub fn linear(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Backoff::Linear { base },
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts are exhausted.
    ///
    /// Returns the last error together with the number of attempts made.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, (E, u32)>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => {
                    tracing::debug!(attempt, error = %err, "Permanent error, not retrying");
                    return Err((err, attempt));
                }
                Err(err) if attempt >= max_attempts => {
                    tracing::warn!(attempt, error = %err, "Retry attempts exhausted");
                    return Err((err, attempt));
                }
                Err(err) => {
                    let delay = self.backoff.delay_for(attempt);
                    tracing::debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn linear_backoff_scales_with_attempt() {
        let backoff = Backoff::Linear {
            base: Duration::from_millis(500),
        };
        assert_eq!(backoff.delay_for(1), Duration::from_millis(500));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(1000));
        assert_eq!(backoff.delay_for(3), Duration::from_millis(1500));
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_secs(1),
            max: Duration::from_secs(5),
        };
        assert_eq!(backoff.delay_for(1), Duration::from_secs(1));
        assert_eq!(backoff.delay_for(3), Duration::from_secs(4));
        assert_eq!(backoff.delay_for(4), Duration::from_secs(5));
        assert_eq!(backoff.delay_for(40), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = RetryPolicy::linear(3, Duration::from_millis(100));
        let result = policy
            .run(|_| async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(PipelineError::TransientIo("flaky".into()))
                } else {
                    Ok("done")
                }
            })
            .await;
        assert_eq!(result.ok(), Some("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_short_circuit() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = RetryPolicy::linear(3, Duration::from_millis(100));
        let result: Result<(), _> = policy
            .run(|_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(PipelineError::StorageConflict("exists".into()))
            })
            .await;
        let (err, attempts) = result.unwrap_err();
        assert_eq!(attempts, 1);
        assert!(matches!(err, PipelineError::StorageConflict(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let policy = RetryPolicy::linear(3, Duration::from_millis(10));
        let result: Result<(), _> = policy
            .run(|_| async { Err(PipelineError::TransientIo("down".into())) })
            .await;
        let (_, attempts) = result.unwrap_err();
        assert_eq!(attempts, 3);
    }
}
