//! Namespace lifecycle controller.
//!
//! This module orchestrates create, read, update, delete and import of a
//! single namespace on top of the planner and the apply engine. It enforces
//! lifecycle preconditions and attaches the namespace identity to every error
//! it returns.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::NamespaceApi;
use crate::context::CallContext;
use crate::error::{ErrorKind, LifecycleError, ProviderError, Result};
use crate::model::{Diagnostic, Diagnostics, ResourceSpec, ResourceState};
use crate::planner::{
    ActionType, ApplyEngine, DiffDetail, PlannedAction, Planner, RetryPolicy,
};

/// Result of one lifecycle operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    /// Namespace name.
    pub resource_name: String,
    /// Action that was carried out.
    pub action: ActionType,
    /// Authoritative state afterwards. `None` once the namespace is gone.
    pub state: Option<ResourceState>,
    /// Fields where the remote side did not take the requested value.
    pub drift: Vec<DiffDetail>,
    /// Remote attempts made, including retries.
    pub attempts: u32,
}

impl ReconcileOutcome {
    /// Warning diagnostics for every drifted field.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        self.drift
            .iter()
            .map(|detail| {
                Diagnostic::warning("Namespace Value Differs From Configuration")
                    .with_attribute(detail.field.clone())
                    .with_resource(self.resource_name.clone())
                    .with_detail(format!(
                        "Requested {:?} but the Temporal frontend reports {:?}.",
                        detail.new_value, detail.old_value
                    ))
            })
            .collect::<Vec<_>>()
            .into()
    }
}

/// Lifecycle controller for Temporal namespaces.
///
/// Operations on different namespaces may run concurrently on one
/// controller; they share the API client and nothing else.
#[derive(Debug)]
pub struct NamespaceController<A: ?Sized> {
    api: Arc<A>,
    planner: Planner,
    engine: ApplyEngine<A>,
}

impl<A: NamespaceApi + ?Sized> NamespaceController<A> {
    /// Creates a controller sharing `api`.
    #[must_use]
    pub fn new(api: Arc<A>, retry: RetryPolicy) -> Self {
        Self {
            engine: ApplyEngine::new(Arc::clone(&api), retry),
            api,
            planner: Planner::new(),
        }
    }

    /// Returns the planner used for every operation.
    #[must_use]
    pub const fn planner(&self) -> &Planner {
        &self.planner
    }

    /// Plans the action for `spec` without applying it.
    ///
    /// # Errors
    ///
    /// Returns the planning error, attributed to the namespace.
    pub fn plan(
        &self,
        spec: &ResourceSpec,
        prior: Option<&ResourceState>,
    ) -> Result<PlannedAction> {
        self.planner
            .plan(spec, prior)
            .map_err(|e| ProviderError::from(e).with_resource(spec.display_name()))
    }

    /// Creates a namespace that has no recorded state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyExists`] if `prior` holds a live
    /// namespace, or any planning or remote error.
    pub async fn create(
        &self,
        spec: &ResourceSpec,
        prior: Option<&ResourceState>,
        ctx: &CallContext,
    ) -> Result<ReconcileOutcome> {
        let name = spec.display_name();

        if let Some(existing) = prior.filter(|state| !state.is_deleted()) {
            return Err(ProviderError::from(LifecycleError::AlreadyExists {
                name: existing.name.clone(),
                id: existing.id.clone(),
            })
            .with_resource(name));
        }

        let action = self.plan(spec, None)?;
        Self::expect_action(&action, ActionType::Create).map_err(|e| e.with_resource(name))?;

        self.apply(&action, None, ctx).await
    }

    /// Reads the current state of a namespace.
    ///
    /// Returns `None` if the namespace no longer exists remotely; the caller
    /// should drop it from state. Never recreates anything.
    ///
    /// # Errors
    ///
    /// Returns any remote error other than not-found.
    pub async fn read(&self, id: &str, ctx: &CallContext) -> Result<Option<ResourceState>> {
        self.fetch(id, ctx).await.map_err(|e| e.with_resource(id))
    }

    /// Updates an existing namespace.
    ///
    /// The namespace is re-read first so the plan reflects the freshest
    /// remote state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ResourceVanished`] if the namespace no
    /// longer exists, or any planning or remote error.
    pub async fn update(
        &self,
        spec: &ResourceSpec,
        prior: &ResourceState,
        ctx: &CallContext,
    ) -> Result<ReconcileOutcome> {
        let name = prior.name.as_str();
        let fresh = self
            .fetch(&prior.id, ctx)
            .await
            .map_err(|e| e.with_resource(name))?;

        let action = self.plan(spec, fresh.as_ref())?;
        match action.action_type {
            ActionType::Create => {
                warn!(
                    namespace = name,
                    id = %prior.id,
                    "Namespace vanished outside of configuration"
                );
                Err(ProviderError::from(LifecycleError::ResourceVanished {
                    id: prior.id.clone(),
                })
                .with_resource(name))
            }
            ActionType::NoOp | ActionType::Update => {
                self.apply(&action, fresh.as_ref(), ctx).await
            }
            ActionType::Delete => {
                Err(Self::unexpected(ActionType::Update, ActionType::Delete).with_resource(name))
            }
        }
    }

    /// Deletes a namespace. A namespace that is already gone counts as
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns any remote error other than not-found.
    pub async fn delete(
        &self,
        prior: &ResourceState,
        ctx: &CallContext,
    ) -> Result<ReconcileOutcome> {
        let action = self.planner.plan_destroy(prior);
        self.apply(&action, Some(prior), ctx).await
    }

    /// Imports an existing namespace by remote identifier.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::ImportNotFound`] if nothing exists under
    /// `id`, or any remote error.
    pub async fn import(&self, id: &str, ctx: &CallContext) -> Result<ResourceState> {
        match self.fetch(id, ctx).await.map_err(|e| e.with_resource(id))? {
            Some(state) => {
                info!(id, namespace = %state.name, "Imported namespace");
                Ok(state)
            }
            None => Err(ProviderError::from(LifecycleError::ImportNotFound {
                id: id.to_string(),
            })
            .with_resource(id)),
        }
    }

    /// Converges a namespace to `spec`, creating it when there is no live
    /// prior state.
    ///
    /// A namespace recorded in state but removed remotely is recreated.
    ///
    /// # Errors
    ///
    /// Returns any lifecycle, planning or remote error.
    pub async fn reconcile(
        &self,
        spec: &ResourceSpec,
        prior: Option<&ResourceState>,
        ctx: &CallContext,
    ) -> Result<ReconcileOutcome> {
        let Some(prior) = prior else {
            return self.create(spec, None, ctx).await;
        };

        match self.update(spec, prior, ctx).await {
            Err(e) if e.kind() == ErrorKind::Drift => {
                warn!(
                    namespace = %prior.name,
                    "Recreating namespace removed outside of configuration"
                );
                self.create(spec, None, ctx).await
            }
            other => other,
        }
    }

    async fn fetch(&self, id: &str, ctx: &CallContext) -> Result<Option<ResourceState>> {
        let result = self
            .engine
            .retry_policy()
            .run(ctx, "read", || self.api.get(id))
            .await;

        match result {
            Ok((state, _)) if state.is_deleted() => {
                debug!(id, namespace = %state.name, "Namespace is deleted remotely");
                Ok(None)
            }
            Ok((state, _)) => Ok(Some(state)),
            Err(e) if e.is_not_found() => {
                debug!(id, "Namespace not found remotely");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn apply(
        &self,
        action: &PlannedAction,
        prior: Option<&ResourceState>,
        ctx: &CallContext,
    ) -> Result<ReconcileOutcome> {
        let outcome = self
            .engine
            .apply(action, prior, ctx)
            .await
            .map_err(|e| e.with_resource(&action.resource_name))?;

        Ok(ReconcileOutcome {
            resource_name: action.resource_name.clone(),
            action: outcome.action,
            state: outcome.state,
            drift: outcome.drift,
            attempts: outcome.attempts,
        })
    }

    fn expect_action(action: &PlannedAction, expected: ActionType) -> Result<()> {
        if action.action_type == expected {
            Ok(())
        } else {
            Err(Self::unexpected(expected, action.action_type))
        }
    }

    fn unexpected(expected: ActionType, found: ActionType) -> ProviderError {
        LifecycleError::UnexpectedAction {
            expected: expected.to_string(),
            found: found.to_string(),
        }
        .into()
    }
}
