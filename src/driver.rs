//! Manifest-wide reconciliation.
//!
//! The driver runs the [`NamespaceController`] over every namespace in a
//! manifest and threads each authoritative state it gets back into the
//! recorded [`ProviderState`]. Namespaces are reconciled concurrently on one
//! shared API handle; a failure on one never blocks or rolls back another.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::client::NamespaceApi;
use crate::config::{Manifest, SpecHasher};
use crate::context::CallContext;
use crate::error::{LifecycleError, ProviderError, Result};
use crate::model::{Diagnostic, Diagnostics, ResourceSpec, ResourceState};
use crate::planner::{ActionType, ProviderPlan, RetryPolicy};
use crate::reconciler::{NamespaceController, ReconcileOutcome};
use crate::state::{HistoryEntry, ProviderState, StateOperation};

/// Result of applying or destroying a set of namespaces.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    /// Successful outcomes, ordered by namespace name.
    pub outcomes: Vec<ReconcileOutcome>,
    /// Drift warnings and per-namespace errors.
    pub diagnostics: Diagnostics,
}

impl RunReport {
    /// Returns true if any namespace failed.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    /// Number of successful outcomes of the given type.
    #[must_use]
    pub fn count(&self, action: ActionType) -> usize {
        self.outcomes.iter().filter(|o| o.action == action).count()
    }
}

type TaskResult = (Option<ResourceSpec>, Result<ReconcileOutcome>);

/// Reconciles whole manifests against recorded state.
#[derive(Debug)]
pub struct ProviderDriver<A: ?Sized> {
    controller: Arc<NamespaceController<A>>,
    hasher: SpecHasher,
}

impl<A: NamespaceApi + ?Sized + 'static> ProviderDriver<A> {
    /// Creates a driver sharing `api` across all namespaces.
    #[must_use]
    pub fn new(api: Arc<A>, retry: RetryPolicy) -> Self {
        Self {
            controller: Arc::new(NamespaceController::new(api, retry)),
            hasher: SpecHasher::new(),
        }
    }

    /// Returns the per-namespace controller.
    #[must_use]
    pub fn controller(&self) -> &NamespaceController<A> {
        &self.controller
    }

    /// Re-reads every recorded namespace and stores what the remote side
    /// reports. Namespaces gone remotely are dropped; their names are
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns the first read error. Successful reads are kept either way.
    pub async fn refresh(
        &self,
        state: &mut ProviderState,
        ctx: &CallContext,
    ) -> Result<Vec<String>> {
        let mut tasks = JoinSet::new();
        for (name, record) in &state.namespaces {
            let controller = Arc::clone(&self.controller);
            let name = name.clone();
            let id = record.state.id.clone();
            let ctx = ctx.clone();
            tasks.spawn(async move { (name, controller.read(&id, &ctx).await) });
        }

        let mut dropped = Vec::new();
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let (name, result) = joined.map_err(|e| ProviderError::internal(e.to_string()))?;
            match result {
                Ok(Some(fresh)) => {
                    let fingerprint = state.record(&name).map(|r| r.fingerprint.clone());
                    state.upsert(fresh, fingerprint);
                }
                Ok(None) => {
                    warn!(namespace = %name, "Namespace no longer exists, dropping from state");
                    state.remove(&name);
                    dropped.push(name);
                }
                Err(e) => {
                    error!(namespace = %name, "Refresh failed: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                dropped.sort();
                debug!(dropped = dropped.len(), "Refreshed state");
                Ok(dropped)
            }
        }
    }

    /// Plans every namespace in `manifest` against `state`, plus deletion
    /// of recorded namespaces the manifest no longer names.
    ///
    /// # Errors
    ///
    /// Returns the first planning error, attributed to its namespace.
    pub fn plan(&self, manifest: &Manifest, state: &ProviderState) -> Result<ProviderPlan> {
        let mut actions = Vec::with_capacity(manifest.namespaces.len());
        for spec in &manifest.namespaces {
            actions.push(self.controller.plan(spec, state.get(spec.display_name()))?);
        }
        for prior in Self::orphans(manifest, state) {
            actions.push(self.controller.planner().plan_destroy(prior));
        }

        Ok(ProviderPlan {
            manifest_hash: self.hasher.hash_manifest(manifest),
            actions,
        })
    }

    /// Converges every namespace to `manifest` and records the results.
    ///
    /// Recorded namespaces missing from the manifest are deleted. Failed
    /// namespaces keep their prior state and are reported as diagnostics.
    pub async fn apply(
        &self,
        manifest: &Manifest,
        state: &mut ProviderState,
        ctx: &CallContext,
    ) -> RunReport {
        let mut tasks = JoinSet::new();

        for spec in &manifest.namespaces {
            let controller = Arc::clone(&self.controller);
            let prior = state.get(spec.display_name()).cloned();
            let spec = spec.clone();
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let result = controller.reconcile(&spec, prior.as_ref(), &ctx).await;
                (Some(spec), result)
            });
        }
        for prior in Self::orphans(manifest, state) {
            self.spawn_delete(&mut tasks, prior.clone(), ctx);
        }

        let report = self.collect(tasks, state).await;
        if !report.has_errors() {
            state.manifest_hash = self.hasher.hash_manifest(manifest);
        }
        Self::add_history(state, StateOperation::Apply, &report);

        info!(
            created = report.count(ActionType::Create),
            updated = report.count(ActionType::Update),
            deleted = report.count(ActionType::Delete),
            failed = report.diagnostics.error_count(),
            "Apply finished"
        );
        report
    }

    /// Deletes every recorded namespace.
    pub async fn destroy(&self, state: &mut ProviderState, ctx: &CallContext) -> RunReport {
        let mut tasks = JoinSet::new();
        for record in state.namespaces.values() {
            self.spawn_delete(&mut tasks, record.state.clone(), ctx);
        }

        let report = self.collect(tasks, state).await;
        if state.namespaces.is_empty() {
            state.manifest_hash.clear();
        }
        Self::add_history(state, StateOperation::Destroy, &report);

        info!(
            deleted = report.count(ActionType::Delete),
            failed = report.diagnostics.error_count(),
            "Destroy finished"
        );
        report
    }

    /// Imports an existing namespace by remote identifier and records it.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::AlreadyExists`] if a namespace of the same
    /// name is already managed, or any import error.
    pub async fn import(
        &self,
        id: &str,
        state: &mut ProviderState,
        ctx: &CallContext,
    ) -> Result<ResourceState> {
        let imported = self.controller.import(id, ctx).await?;

        if let Some(existing) = state.get(&imported.name) {
            return Err(ProviderError::from(LifecycleError::AlreadyExists {
                name: existing.name.clone(),
                id: existing.id.clone(),
            })
            .with_resource(&imported.name));
        }

        state.upsert(imported.clone(), None);
        state.add_history(HistoryEntry::new(
            StateOperation::Import,
            vec![imported.name.clone()],
            None,
        ));
        Ok(imported)
    }

    /// Reads a namespace by managed name, or by remote identifier when the
    /// name is not managed. Managed namespaces are refreshed in `state`.
    ///
    /// # Errors
    ///
    /// Returns any read error.
    pub async fn read(
        &self,
        name_or_id: &str,
        state: &mut ProviderState,
        ctx: &CallContext,
    ) -> Result<Option<ResourceState>> {
        let Some(record) = state.record(name_or_id) else {
            return self.controller.read(name_or_id, ctx).await;
        };

        let fingerprint = record.fingerprint.clone();
        let fresh = self.controller.read(&record.state.id, ctx).await?;
        match &fresh {
            Some(current) => state.upsert(current.clone(), Some(fingerprint)),
            None => {
                warn!(namespace = name_or_id, "Namespace no longer exists, dropping from state");
                state.remove(name_or_id);
            }
        }
        Ok(fresh)
    }

    fn orphans<'s>(manifest: &Manifest, state: &'s ProviderState) -> Vec<&'s ResourceState> {
        let wanted: BTreeSet<&str> = manifest.names().into_iter().collect();
        state
            .namespaces
            .iter()
            .filter(|(name, _)| !wanted.contains(name.as_str()))
            .map(|(_, record)| &record.state)
            .collect()
    }

    fn spawn_delete(
        &self,
        tasks: &mut JoinSet<TaskResult>,
        prior: ResourceState,
        ctx: &CallContext,
    ) {
        let controller = Arc::clone(&self.controller);
        let ctx = ctx.clone();
        tasks.spawn(async move { (None, controller.delete(&prior, &ctx).await) });
    }

    async fn collect(
        &self,
        mut tasks: JoinSet<TaskResult>,
        state: &mut ProviderState,
    ) -> RunReport {
        let mut report = RunReport::default();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((spec, Ok(outcome))) => {
                    report.diagnostics.extend(outcome.diagnostics());
                    self.record(state, spec.as_ref(), &outcome);
                    report.outcomes.push(outcome);
                }
                Ok((_, Err(e))) => {
                    error!(namespace = e.resource_name().unwrap_or_default(), "{e}");
                    report.diagnostics.extend(e.to_diagnostics());
                }
                Err(e) => {
                    error!("Reconciliation task failed: {e}");
                    report.diagnostics.push(
                        Diagnostic::error("Internal Provider Error").with_detail(e.to_string()),
                    );
                }
            }
        }

        report
            .outcomes
            .sort_by(|a, b| a.resource_name.cmp(&b.resource_name));
        report
    }

    fn record(
        &self,
        state: &mut ProviderState,
        spec: Option<&ResourceSpec>,
        outcome: &ReconcileOutcome,
    ) {
        match &outcome.state {
            Some(current) => {
                let fingerprint = spec
                    .and_then(|s| s.resolve(Some(current)).ok())
                    .map(|resolved| self.hasher.hash_spec(&resolved));
                state.upsert(current.clone(), fingerprint);
            }
            None => {
                state.remove(&outcome.resource_name);
            }
        }
    }

    fn add_history(state: &mut ProviderState, operation: StateOperation, report: &RunReport) {
        let touched: Vec<String> = report
            .outcomes
            .iter()
            .filter(|o| o.action != ActionType::NoOp)
            .map(|o| o.resource_name.clone())
            .collect();
        let error = report
            .diagnostics
            .as_slice()
            .iter()
            .find(|d| d.is_error())
            .map(ToString::to_string);

        if !touched.is_empty() || error.is_some() {
            state.add_history(HistoryEntry::new(operation, touched, error));
        }
    }
}
