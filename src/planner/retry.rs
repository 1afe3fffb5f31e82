//! Bounded exponential backoff for transient remote failures.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::context::CallContext;
use crate::error::Result;

/// Retry policy applied to each remote call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let factor = self.multiplier.powi(exponent);

        Duration::try_from_secs_f64(self.initial_backoff.as_secs_f64() * factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Runs `call` until it succeeds, fails permanently, or runs out of
    /// attempts. Returns the value and the number of attempts made.
    ///
    /// Only retryable errors are retried. Both the call and every backoff
    /// sleep race `ctx`.
    ///
    /// # Errors
    ///
    /// Returns the first non-retryable error, the last retryable error once
    /// attempts run out, or a cancellation error.
    pub async fn run<T, F, Fut>(
        &self,
        ctx: &CallContext,
        operation: &str,
        call: F,
    ) -> Result<(T, u32)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let (result, attempts) = self.attempt(ctx, operation, call).await;
        result.map(|value| (value, attempts))
    }

    /// Like [`RetryPolicy::run`], but reports the attempts made on failure
    /// too. Zero attempts means the context stopped before the first call.
    pub async fn attempt<T, F, Fut>(
        &self,
        ctx: &CallContext,
        operation: &str,
        mut call: F,
    ) -> (Result<T>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempts = 0;
        loop {
            if let Err(e) = ctx.check() {
                return (Err(e), attempts);
            }
            attempts += 1;
            match ctx.run(call()).await {
                Ok(value) => return (Ok(value), attempts),
                Err(e) if e.is_retryable() && attempts < self.max_attempts => {
                    let delay = self.backoff(attempts);
                    warn!(
                        operation,
                        attempt = attempts,
                        max_attempts = self.max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Transient failure, retrying: {e}"
                    );
                    if let Err(stopped) = ctx.sleep(delay).await {
                        return (Err(stopped), attempts);
                    }
                }
                Err(e) => {
                    debug!(operation, attempt = attempts, "Giving up: {e}");
                    return (Err(e), attempts);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, ProviderError, RemoteError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
            multiplier: 2.0,
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(1000),
            multiplier: 2.0,
        };

        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(2), Duration::from_millis(400));
        assert_eq!(policy.backoff(3), Duration::from_millis(800));
        assert_eq!(policy.backoff(4), Duration::from_millis(1000));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn test_policy_from_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_backoff, Duration::from_millis(200));
        assert_eq!(policy.max_backoff, Duration::from_millis(5000));
    }

    #[tokio::test]
    async fn test_retries_up_to_ceiling() {
        let calls = AtomicU32::new(0);
        let policy = fast_policy(3);

        let result: Result<((), u32)> = policy
            .run(&CallContext::new(), "get", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(RemoteError::unavailable("restarting").into()) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.expect_err("exhausted").kind(), ErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let policy = fast_policy(5);

        let (value, attempts) = policy
            .run(&CallContext::new(), "get", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(RemoteError::unavailable("restarting").into())
                    } else {
                        Ok("ok")
                    }
                }
            })
            .await
            .expect("recovers");

        assert_eq!(value, "ok");
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = fast_policy(5);

        let result: Result<((), u32)> = policy
            .run(&CallContext::new(), "create", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::from(RemoteError::validation("bad name"))) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.expect_err("permanent").kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_cancelled_context_short_circuits() {
        let calls = AtomicU32::new(0);
        let ctx = CallContext::new();
        ctx.cancel();

        let result: Result<((), u32)> = RetryPolicy::none()
            .run(&ctx, "delete", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert_eq!(result.expect_err("cancelled").kind(), ErrorKind::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_attempt_counts_failed_calls() {
        let calls = AtomicU32::new(0);
        let policy = fast_policy(5);

        let (result, attempts) = policy
            .attempt(&CallContext::new(), "delete", || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    let err = if n == 0 {
                        RemoteError::unavailable("restarting")
                    } else {
                        RemoteError::not_found("gone")
                    };
                    Err::<(), _>(ProviderError::from(err))
                }
            })
            .await;

        assert_eq!(result.expect_err("not found").kind(), ErrorKind::NotFound);
        assert_eq!(attempts, 2);
    }
}
