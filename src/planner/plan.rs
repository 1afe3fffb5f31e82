//! Plan construction.
//!
//! Planning is pure: it never touches the network, the clock or any random
//! source, so the same inputs always produce the same plan.

use serde::Serialize;
use tracing::debug;

use crate::config::SpecHasher;
use crate::error::PlanError;
use crate::model::{Diagnostic, Diagnostics, NamespaceSpec, ResourceSpec, ResourceState, ATTR_NAME};

use super::diff::{mutable_changes, DiffDetail};

/// Types of actions in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    /// Register a new namespace.
    Create,
    /// Change the mutable attributes of an existing namespace.
    Update,
    /// Remove a namespace.
    Delete,
    /// Nothing to do.
    #[serde(rename = "no-op")]
    NoOp,
}

/// A single planned action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    /// Action type.
    pub action_type: ActionType,
    /// Namespace name.
    pub resource_name: String,
    /// Resolved desired configuration. Absent for deletes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec: Option<NamespaceSpec>,
    /// Remote identifier the action targets. Absent for creates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    /// Per-field changes an update will make.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<DiffDetail>,
    /// Reason for this action.
    pub reason: String,
    /// Fingerprint of the resolved configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Computes the action that moves a namespace to its desired configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct Planner {
    hasher: SpecHasher,
}

impl Planner {
    /// Creates a new planner.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hasher: SpecHasher::new(),
        }
    }

    /// Plans the action for `spec` given the last-known state.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Deferred`] while any input is unknown,
    /// [`PlanError::Validation`] for invalid input, and
    /// [`PlanError::ImmutableAttribute`] if the name would change.
    pub fn plan(
        &self,
        spec: &ResourceSpec,
        prior: Option<&ResourceState>,
    ) -> Result<PlannedAction, PlanError> {
        let prior = prior.filter(|state| !state.is_deleted());
        let resolved = spec.resolve(prior)?;
        let fingerprint = Some(self.hasher.hash_spec(&resolved));

        let Some(prior) = prior else {
            debug!(namespace = %resolved.name, "No prior state, planning create");
            return Ok(PlannedAction {
                action_type: ActionType::Create,
                resource_name: resolved.name.clone(),
                spec: Some(resolved),
                target_id: None,
                changes: vec![],
                reason: String::from("namespace does not exist"),
                fingerprint,
            });
        };

        if prior.name != resolved.name {
            return Err(PlanError::ImmutableAttribute {
                attribute: ATTR_NAME.to_string(),
                from: prior.name.clone(),
                to: resolved.name,
            });
        }

        let changes = mutable_changes(&resolved, prior);
        let (action_type, reason) = if changes.is_empty() {
            (ActionType::NoOp, String::from("namespace is up to date"))
        } else {
            let fields: Vec<_> = changes.iter().map(|c| c.field.as_str()).collect();
            (ActionType::Update, format!("{} changed", fields.join(", ")))
        };

        debug!(namespace = %resolved.name, action = %action_type, "Planned action");

        Ok(PlannedAction {
            action_type,
            resource_name: resolved.name.clone(),
            spec: Some(resolved),
            target_id: Some(prior.id.clone()),
            changes,
            reason,
            fingerprint,
        })
    }

    /// Plans removal of a namespace.
    #[must_use]
    pub fn plan_destroy(&self, prior: &ResourceState) -> PlannedAction {
        PlannedAction {
            action_type: ActionType::Delete,
            resource_name: prior.name.clone(),
            spec: None,
            target_id: Some(prior.id.clone()),
            changes: vec![],
            reason: String::from("namespace is being destroyed"),
            fingerprint: None,
        }
    }
}

impl PlannedAction {
    /// Returns true if applying this action changes anything.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.action_type != ActionType::NoOp
    }

    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        match self.action_type {
            ActionType::Create => format!("Create namespace '{}'", self.resource_name),
            ActionType::Update => format!("Update namespace '{}'", self.resource_name),
            ActionType::Delete => format!("Delete namespace '{}'", self.resource_name),
            ActionType::NoOp => format!("No change for '{}'", self.resource_name),
        }
    }

    /// Warnings about changes the remote side will not carry out.
    ///
    /// Temporal ignores empty values on update, so clearing a field that is
    /// set remotely leaves it unchanged and shows up as drift on every run.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        for change in &self.changes {
            if change.new_value.is_empty() && !change.old_value.is_empty() {
                diagnostics.push(
                    Diagnostic::warning(format!("Cannot clear {}", change.field))
                        .with_detail(format!(
                            "Temporal keeps the current value {:?} when updated with an empty one",
                            change.old_value
                        ))
                        .with_attribute(&change.field)
                        .with_resource(&self.resource_name),
                );
            }
        }
        diagnostics
    }
}

/// Plans for every namespace a manifest touches.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProviderPlan {
    /// Fingerprint of the manifest the plan was computed from.
    pub manifest_hash: String,
    /// Planned actions in manifest order, followed by removals.
    pub actions: Vec<PlannedAction>,
}

impl ProviderPlan {
    /// Returns true if no action changes anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.actions.iter().any(PlannedAction::has_changes)
    }

    /// Number of actions of the given type.
    #[must_use]
    pub fn count(&self, action_type: ActionType) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action_type == action_type)
            .count()
    }

    /// Warnings raised by any planned action.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        for action in &self.actions {
            diagnostics.extend(action.diagnostics());
        }
        diagnostics
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::NoOp => "no-op",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.action_type, self.resource_name)?;
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ProviderPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No changes required");
        }

        writeln!(
            f,
            "Plan: {} to create, {} to update, {} to delete",
            self.count(ActionType::Create),
            self.count(ActionType::Update),
            self.count(ActionType::Delete)
        )?;
        for action in self.actions.iter().filter(|a| a.has_changes()) {
            writeln!(f, "  {action}")?;
            for change in &action.changes {
                writeln!(f, "      {change}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{sample_state, AttrValue, NamespaceState};

    #[test]
    fn test_plan_without_prior_is_create() {
        let spec = ResourceSpec::new("billing").with_description("Billing workflows");
        let action = Planner::new().plan(&spec, None).expect("plannable");

        assert_eq!(action.action_type, ActionType::Create);
        assert_eq!(action.target_id, None);
        let resolved = action.spec.expect("spec");
        assert_eq!(resolved.name, "billing");
        assert_eq!(resolved.description, "Billing workflows");
        assert_eq!(resolved.owner_email, "");
    }

    #[test]
    fn test_plan_of_own_state_is_noop() {
        let state = sample_state("billing");
        let spec = ResourceSpec::from(&NamespaceSpec::from_state(&state));

        let action = Planner::new().plan(&spec, Some(&state)).expect("plannable");

        assert_eq!(action.action_type, ActionType::NoOp);
        assert!(action.changes.is_empty());
        assert!(!action.has_changes());
    }

    #[test]
    fn test_unset_optionals_adopt_prior_values() {
        let state = sample_state("billing");
        let action = Planner::new()
            .plan(&ResourceSpec::new("billing"), Some(&state))
            .expect("plannable");

        assert_eq!(action.action_type, ActionType::NoOp);
    }

    #[test]
    fn test_description_change_is_update() {
        let state = sample_state("billing");
        let spec = ResourceSpec::new("billing").with_description("Billing");

        let action = Planner::new().plan(&spec, Some(&state)).expect("plannable");

        assert_eq!(action.action_type, ActionType::Update);
        assert_eq!(action.target_id.as_deref(), Some("billing-id"));
        assert_eq!(action.changes.len(), 1);
        assert_eq!(action.changes[0].field, "description");
        assert_eq!(action.reason, "description changed");
    }

    #[test]
    fn test_rename_is_rejected() {
        let state = sample_state("billing");
        let spec = ResourceSpec::new("invoicing");

        let err = Planner::new().plan(&spec, Some(&state)).expect_err("immutable");

        assert_eq!(
            err,
            PlanError::ImmutableAttribute {
                attribute: String::from("name"),
                from: String::from("billing"),
                to: String::from("invoicing"),
            }
        );
    }

    #[test]
    fn test_deleted_prior_is_treated_as_absent() {
        let mut state = sample_state("billing");
        state.state = NamespaceState::Deleted;

        let action = Planner::new()
            .plan(&ResourceSpec::new("billing"), Some(&state))
            .expect("plannable");

        assert_eq!(action.action_type, ActionType::Create);
        assert_eq!(action.spec.expect("spec").description, "");
    }

    #[test]
    fn test_unknown_input_defers() {
        let spec = ResourceSpec {
            owner_email: AttrValue::Unknown,
            ..ResourceSpec::new("billing")
        };

        let err = Planner::new().plan(&spec, None).expect_err("deferred");
        assert!(matches!(err, PlanError::Deferred { ref attributes } if attributes == &["owner_email"]));
    }

    #[test]
    fn test_planning_is_deterministic() {
        let state = sample_state("billing");
        let spec = ResourceSpec::new("billing").with_owner_email("ops@example.com");
        let planner = Planner::new();

        let first = planner.plan(&spec, Some(&state)).expect("plannable");
        let second = planner.plan(&spec, Some(&state)).expect("plannable");

        assert_eq!(first, second);
        assert!(first.fingerprint.is_some());
    }

    #[test]
    fn test_destroy_targets_prior_id() {
        let state = sample_state("billing");
        let action = Planner::new().plan_destroy(&state);

        assert_eq!(action.action_type, ActionType::Delete);
        assert_eq!(action.target_id.as_deref(), Some("billing-id"));
        assert!(action.spec.is_none());
    }

    #[test]
    fn test_provider_plan_summary() {
        let planner = Planner::new();
        let state = sample_state("billing");
        let plan = ProviderPlan {
            manifest_hash: String::from("abc"),
            actions: vec![
                planner
                    .plan(&ResourceSpec::new("orders"), None)
                    .expect("plannable"),
                planner
                    .plan(&ResourceSpec::new("billing"), Some(&state))
                    .expect("plannable"),
            ],
        };

        assert!(!plan.is_empty());
        assert_eq!(plan.count(ActionType::Create), 1);
        assert_eq!(plan.count(ActionType::NoOp), 1);
        let rendered = plan.to_string();
        assert!(rendered.starts_with("Plan: 1 to create, 0 to update, 0 to delete"));
        assert!(!rendered.contains("billing"));
    }

    #[test]
    fn test_clearing_a_set_field_warns() {
        let prior = sample_state("billing");
        let spec = ResourceSpec::new("billing").with_description("");

        let action = Planner::new().plan(&spec, Some(&prior)).expect("plannable");
        assert_eq!(action.action_type, ActionType::Update);

        let diagnostics = action.diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.for_attribute("description").len(), 1);

        let plan = ProviderPlan {
            manifest_hash: String::new(),
            actions: vec![action],
        };
        assert_eq!(plan.diagnostics().len(), 1);
    }
}
