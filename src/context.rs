//! Per-operation cancellation and deadlines.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, Result};

/// Cancellation scope for one reconciliation.
///
/// Every remote call and every retry sleep races this context. Children share
/// the parent's token, so cancelling the root stops every derived operation.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Creates a context with a fresh token and no deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context driven by an existing token.
    #[must_use]
    pub const fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Returns a child context that also stops after `timeout`.
    ///
    /// The earlier of the two deadlines wins.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            token: self.token.child_token(),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    /// Cancels this context and every child.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the context is cancelled or past its deadline.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.check().is_err()
    }

    /// Fails fast if the context has already stopped.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Cancelled`] once cancelled or past the deadline.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(ProviderError::cancelled("operation was cancelled"));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ProviderError::cancelled("operation deadline exceeded"));
        }
        Ok(())
    }

    /// Runs `fut` unless the context is cancelled or its deadline passes first.
    ///
    /// # Errors
    ///
    /// Returns the future's own error, or [`ProviderError::Cancelled`].
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            () = self.token.cancelled() => Err(ProviderError::cancelled("operation was cancelled")),
            () = deadline => Err(ProviderError::cancelled("operation deadline exceeded")),
            result = fut => result,
        }
    }

    /// Sleeps for `duration` unless the context stops first.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Cancelled`] if the context stops first.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.run(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_check_reflects_cancellation() {
        let ctx = CallContext::new();
        tokio_test::assert_ok!(ctx.check());

        ctx.cancel();
        tokio_test::assert_err!(ctx.check());
    }

    #[tokio::test]
    async fn test_run_completes() {
        let ctx = CallContext::new();
        let value = ctx.run(async { Ok(7) }).await.expect("completes");
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let ctx = CallContext::new();
        ctx.cancel();

        let err = ctx.run(async { Ok(()) }).await.expect_err("cancelled");
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(ctx.is_done());
    }

    #[tokio::test]
    async fn test_parent_cancel_reaches_child() {
        let root = CallContext::new();
        let child = root.with_timeout(Duration::from_secs(60));

        let handle = tokio::spawn(async move {
            child.sleep(Duration::from_secs(60)).await
        });
        root.cancel();

        let result = handle.await.expect("task joined");
        assert_eq!(result.expect_err("cancelled").kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_deadline_elapses() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(5));
        let err = ctx
            .run(std::future::pending::<Result<()>>())
            .await
            .expect_err("deadline");

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(err.to_string().contains("deadline"));
    }
}
