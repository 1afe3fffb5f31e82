//! Apply engine for executing planned actions.
//!
//! The engine executes exactly one action per call against the remote API.
//! The prior state is only borrowed, so a failed action cannot corrupt it;
//! callers replace their state only with what a successful outcome returns.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::client::NamespaceApi;
use crate::context::CallContext;
use crate::error::{ErrorKind, ProviderError, Result};
use crate::model::{NamespaceSpec, ResourceState};

use super::diff::{drift, DiffDetail};
use super::plan::{ActionType, PlannedAction};
use super::retry::RetryPolicy;

/// Result of applying one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// The action that was applied.
    pub action: ActionType,
    /// State after the action. `None` once the namespace is gone.
    pub state: Option<ResourceState>,
    /// Fields where the remote side did not take the requested value.
    pub drift: Vec<DiffDetail>,
    /// Remote attempts made, including retries.
    pub attempts: u32,
}

/// Executes planned actions against a [`NamespaceApi`].
#[derive(Debug)]
pub struct ApplyEngine<A: ?Sized> {
    api: Arc<A>,
    retry: RetryPolicy,
}

impl<A: ?Sized> Clone for ApplyEngine<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            retry: self.retry,
        }
    }
}

impl<A: NamespaceApi + ?Sized> ApplyEngine<A> {
    /// Creates an engine sharing `api`.
    #[must_use]
    pub const fn new(api: Arc<A>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// Returns the retry policy in use.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Applies one planned action.
    ///
    /// # Errors
    ///
    /// Returns the remote error once retries are exhausted, a cancellation
    /// error, or an internal error if the action is missing data it needs.
    /// On error nothing is recorded and `prior` remains the valid state.
    pub async fn apply(
        &self,
        action: &PlannedAction,
        prior: Option<&ResourceState>,
        ctx: &CallContext,
    ) -> Result<ApplyOutcome> {
        debug!(
            namespace = %action.resource_name,
            action = %action.action_type,
            "Applying action"
        );

        let result = match action.action_type {
            ActionType::Create => self.execute_create(action, ctx).await,
            ActionType::Update => self.execute_update(action, ctx).await,
            ActionType::Delete => self.execute_delete(action, ctx).await,
            ActionType::NoOp => Ok(ApplyOutcome {
                action: ActionType::NoOp,
                state: prior.cloned(),
                drift: vec![],
                attempts: 0,
            }),
        };

        match &result {
            Ok(outcome) => {
                for detail in &outcome.drift {
                    warn!(
                        namespace = %action.resource_name,
                        "Remote value differs from configuration: {detail}"
                    );
                }
            }
            Err(e) => error!(
                namespace = %action.resource_name,
                action = %action.action_type,
                "Action failed: {e}"
            ),
        }

        result
    }

    async fn execute_create(
        &self,
        action: &PlannedAction,
        ctx: &CallContext,
    ) -> Result<ApplyOutcome> {
        let spec = Self::required_spec(action)?;

        let (result, mut attempts) = self
            .retry
            .attempt(ctx, "create", || self.api.create(spec))
            .await;

        let state = match result {
            Ok(state) => state,
            // A retried registration can collide with an earlier attempt that
            // committed remotely before failing locally.
            Err(e) if attempts > 1 && e.kind() == ErrorKind::AlreadyExists => {
                warn!(
                    namespace = %spec.name,
                    attempts,
                    "Namespace registered by an earlier attempt, adopting it"
                );
                let (state, described) = self
                    .retry
                    .run(ctx, "describe", || self.api.get_by_name(&spec.name))
                    .await?;
                attempts += described;
                state
            }
            Err(e) => return Err(e),
        };

        info!(namespace = %state.name, id = %state.id, "Created namespace");

        Ok(ApplyOutcome {
            action: ActionType::Create,
            drift: drift(spec, &state),
            state: Some(state),
            attempts,
        })
    }

    async fn execute_update(
        &self,
        action: &PlannedAction,
        ctx: &CallContext,
    ) -> Result<ApplyOutcome> {
        let spec = Self::required_spec(action)?;
        let id = Self::required_id(action)?;

        let (state, attempts) = self
            .retry
            .run(ctx, "update", || self.api.update(id, spec))
            .await?;

        info!(namespace = %state.name, id = %state.id, "Updated namespace");

        Ok(ApplyOutcome {
            action: ActionType::Update,
            drift: drift(spec, &state),
            state: Some(state),
            attempts,
        })
    }

    async fn execute_delete(
        &self,
        action: &PlannedAction,
        ctx: &CallContext,
    ) -> Result<ApplyOutcome> {
        let id = Self::required_id(action)?;

        let (result, attempts) = self
            .retry
            .attempt(ctx, "delete", || self.api.delete(id))
            .await;
        match result {
            Ok(()) => info!(namespace = %action.resource_name, id, "Deleted namespace"),
            Err(e) if e.is_not_found() => {
                info!(namespace = %action.resource_name, id, "Namespace was already deleted");
            }
            Err(e) => return Err(e),
        }

        Ok(ApplyOutcome {
            action: ActionType::Delete,
            state: None,
            drift: vec![],
            attempts,
        })
    }

    fn required_spec(action: &PlannedAction) -> Result<&NamespaceSpec> {
        action.spec.as_ref().ok_or_else(|| {
            ProviderError::internal(format!("{} action has no resolved spec", action.action_type))
        })
    }

    fn required_id(action: &PlannedAction) -> Result<&str> {
        action.target_id.as_deref().ok_or_else(|| {
            ProviderError::internal(format!("{} action has no target id", action.action_type))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockNamespaceApi;
    use crate::error::RemoteError;
    use crate::model::{sample_state, ResourceSpec};
    use crate::planner::Planner;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Blocks every update until the caller gives up.
    #[derive(Default)]
    struct StalledUpdates {
        started: Notify,
    }

    #[async_trait]
    impl NamespaceApi for StalledUpdates {
        async fn create(&self, _spec: &NamespaceSpec) -> Result<ResourceState> {
            Err(ProviderError::internal("unexpected create"))
        }

        async fn get(&self, _id: &str) -> Result<ResourceState> {
            Err(ProviderError::internal("unexpected get"))
        }

        async fn get_by_name(&self, _name: &str) -> Result<ResourceState> {
            Err(ProviderError::internal("unexpected get_by_name"))
        }

        async fn update(&self, _id: &str, _spec: &NamespaceSpec) -> Result<ResourceState> {
            self.started.notify_one();
            std::future::pending().await
        }

        async fn delete(&self, _id: &str) -> Result<()> {
            Err(ProviderError::internal("unexpected delete"))
        }
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            multiplier: 1.0,
        }
    }

    fn engine(mock: MockNamespaceApi, max_attempts: u32) -> ApplyEngine<MockNamespaceApi> {
        ApplyEngine::new(Arc::new(mock), fast_retry(max_attempts))
    }

    #[tokio::test]
    async fn test_create_records_authoritative_state() {
        let mut mock = MockNamespaceApi::new();
        mock.expect_create()
            .times(1)
            .returning(|spec| {
                let mut state = sample_state(&spec.name);
                state.description.clone_from(&spec.description);
                state.owner_email.clone_from(&spec.owner_email);
                Ok(state)
            });

        let action = Planner::new()
            .plan(&ResourceSpec::new("billing").with_description("Billing"), None)
            .expect("plannable");
        let outcome = engine(mock, 3)
            .apply(&action, None, &CallContext::new())
            .await
            .expect("created");

        let state = outcome.state.expect("state");
        assert_eq!(state.id, "billing-id");
        assert_eq!(state.description, "Billing");
        assert!(outcome.drift.is_empty());
        assert_eq!(outcome.attempts, 1);
    }

    #[tokio::test]
    async fn test_failed_update_leaves_prior_untouched() {
        let prior = sample_state("billing");
        let snapshot = prior.clone();

        let mut mock = MockNamespaceApi::new();
        mock.expect_update()
            .times(1)
            .returning(|_, _| Err(RemoteError::validation("rejected").into()));

        let action = Planner::new()
            .plan(&ResourceSpec::new("billing").with_description("Billing"), Some(&prior))
            .expect("plannable");
        let err = engine(mock, 3)
            .apply(&action, Some(&prior), &CallContext::new())
            .await
            .expect_err("rejected");

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(prior, snapshot);
    }

    #[tokio::test]
    async fn test_update_reports_drift() {
        let prior = sample_state("billing");

        let mut mock = MockNamespaceApi::new();
        // The remote side normalizes the description and ignores the request.
        mock.expect_update()
            .returning(|id, _| {
                let mut state = sample_state("billing");
                state.id = id.to_string();
                Ok(state)
            });

        let action = Planner::new()
            .plan(&ResourceSpec::new("billing").with_description("Billing"), Some(&prior))
            .expect("plannable");
        let outcome = engine(mock, 1)
            .apply(&action, Some(&prior), &CallContext::new())
            .await
            .expect("updated");

        assert_eq!(outcome.drift.len(), 1);
        assert_eq!(outcome.drift[0].field, "description");
        assert_eq!(outcome.drift[0].new_value, "Billing");
    }

    #[tokio::test]
    async fn test_retry_ceiling_surfaces_last_error() {
        let mut mock = MockNamespaceApi::new();
        mock.expect_create()
            .times(3)
            .returning(|_| Err(RemoteError::unavailable("frontend restarting").into()));

        let action = Planner::new()
            .plan(&ResourceSpec::new("billing"), None)
            .expect("plannable");
        let err = engine(mock, 3)
            .apply(&action, None, &CallContext::new())
            .await
            .expect_err("unavailable");

        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let prior = sample_state("billing");

        let mut mock = MockNamespaceApi::new();
        mock.expect_delete()
            .withf(|id| id == "billing-id")
            .times(2)
            .returning(|_| Err(RemoteError::not_found("no such namespace").into()));

        let engine = engine(mock, 3);
        let action = Planner::new().plan_destroy(&prior);

        for _ in 0..2 {
            let outcome = engine
                .apply(&action, Some(&prior), &CallContext::new())
                .await
                .expect("deleted");
            assert_eq!(outcome.state, None);
        }
    }

    #[tokio::test]
    async fn test_noop_makes_no_calls() {
        let prior = sample_state("billing");
        let mock = MockNamespaceApi::new();

        let action = Planner::new()
            .plan(&ResourceSpec::new("billing"), Some(&prior))
            .expect("plannable");
        let outcome = engine(mock, 3)
            .apply(&action, Some(&prior), &CallContext::new())
            .await
            .expect("no-op");

        assert_eq!(outcome.action, ActionType::NoOp);
        assert_eq!(outcome.state, Some(prior));
        assert_eq!(outcome.attempts, 0);
    }

    #[tokio::test]
    async fn test_cancelled_apply_records_nothing() {
        let mut mock = MockNamespaceApi::new();
        mock.expect_create().never();

        let ctx = CallContext::new();
        ctx.cancel();

        let action = Planner::new()
            .plan(&ResourceSpec::new("billing"), None)
            .expect("plannable");
        let err = engine(mock, 3)
            .apply(&action, None, &ctx)
            .await
            .expect_err("cancelled");

        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn test_existing_namespace_is_not_adopted() {
        let mut mock = MockNamespaceApi::new();
        mock.expect_create().times(1).returning(|_| {
            Err(RemoteError::AlreadyExists {
                message: String::from("namespace already registered"),
            }
            .into())
        });
        mock.expect_get_by_name().never();

        let action = Planner::new()
            .plan(&ResourceSpec::new("billing"), None)
            .expect("plannable");
        let err = engine(mock, 3)
            .apply(&action, None, &CallContext::new())
            .await
            .expect_err("already exists");

        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_delete_reports_attempts_before_not_found() {
        let prior = sample_state("billing");

        let mut mock = MockNamespaceApi::new();
        let mut calls = 0;
        mock.expect_delete().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(RemoteError::unavailable("frontend restarting").into())
            } else {
                Err(RemoteError::not_found("no such namespace").into())
            }
        });

        let outcome = engine(mock, 3)
            .apply(&Planner::new().plan_destroy(&prior), Some(&prior), &CallContext::new())
            .await
            .expect("deleted");

        assert_eq!(outcome.state, None);
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_cancel_during_update_keeps_prior() {
        let prior = sample_state("billing");
        let snapshot = prior.clone();

        let api = Arc::new(StalledUpdates::default());
        let engine = ApplyEngine::new(Arc::clone(&api), fast_retry(3));
        let action = Planner::new()
            .plan(&ResourceSpec::new("billing").with_description("Billing"), Some(&prior))
            .expect("plannable");
        assert_eq!(action.action_type, ActionType::Update);

        let ctx = CallContext::new();
        let (result, ()) = tokio::join!(engine.apply(&action, Some(&prior), &ctx), async {
            api.started.notified().await;
            ctx.cancel();
        });

        assert_eq!(result.expect_err("cancelled").kind(), ErrorKind::Cancelled);
        assert_eq!(prior, snapshot);
    }
}
