//! Desired namespace configuration.
//!
//! [`ResourceSpec`] is what the caller supplies and may still contain unset or
//! unknown values. [`NamespaceSpec`] is the resolved, validated form and is the
//! only shape ever sent to the remote API.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

use crate::error::PlanError;

use super::state::ResourceState;
use super::value::AttrValue;

/// Attribute name of the namespace name.
pub const ATTR_NAME: &str = "name";

/// Attribute name of the namespace description.
pub const ATTR_DESCRIPTION: &str = "description";

/// Attribute name of the namespace owner email.
pub const ATTR_OWNER_EMAIL: &str = "owner_email";

/// Desired configuration as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Namespace name, the natural key. Required; immutable after creation.
    #[serde(default)]
    pub name: AttrValue<String>,
    /// Free-form description. Optional; adopts the remote value when unset.
    #[serde(default)]
    pub description: AttrValue<String>,
    /// Owner contact. Optional; adopts the remote value when unset.
    #[serde(default)]
    pub owner_email: AttrValue<String>,
}

/// Resolved and validated desired configuration.
///
/// Empty strings mean "not set", matching how the remote API reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Validate)]
pub struct NamespaceSpec {
    /// Namespace name.
    #[validate(
        length(min = 1, max = 255, message = "must be between 1 and 255 characters"),
        custom(function = "validate_namespace_name")
    )]
    pub name: String,
    /// Namespace description.
    pub description: String,
    /// Namespace owner email.
    #[validate(custom(function = "validate_owner_email"))]
    pub owner_email: String,
}

impl ResourceSpec {
    /// Creates a spec with only the name set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: AttrValue::Known(name.into()),
            description: AttrValue::Null,
            owner_email: AttrValue::Null,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = AttrValue::Known(description.into());
        self
    }

    /// Sets the owner email.
    #[must_use]
    pub fn with_owner_email(mut self, owner_email: impl Into<String>) -> Self {
        self.owner_email = AttrValue::Known(owner_email.into());
        self
    }

    /// Name used to label diagnostics, even before the name is known.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match &self.name {
            AttrValue::Known(name) => name,
            AttrValue::Unknown => "(known after apply)",
            AttrValue::Null => "(unnamed)",
        }
    }

    /// Attributes whose values are not yet known, in schema order.
    #[must_use]
    pub fn unknown_attributes(&self) -> Vec<String> {
        [
            (ATTR_NAME, self.name.is_unknown()),
            (ATTR_DESCRIPTION, self.description.is_unknown()),
            (ATTR_OWNER_EMAIL, self.owner_email.is_unknown()),
        ]
        .into_iter()
        .filter(|(_, unknown)| *unknown)
        .map(|(attribute, _)| attribute.to_string())
        .collect()
    }

    /// Resolves this spec into concrete values.
    ///
    /// Unset optional attributes take the value from `prior` (they are
    /// computed by the remote side when not configured) or stay empty when
    /// nothing exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::Deferred`] if any value is unknown and
    /// [`PlanError::Validation`] if the resolved values are invalid.
    pub fn resolve(&self, prior: Option<&ResourceState>) -> Result<NamespaceSpec, PlanError> {
        let unknown = self.unknown_attributes();
        if !unknown.is_empty() {
            return Err(PlanError::Deferred { attributes: unknown });
        }

        let Some(name) = self.name.known() else {
            return Err(PlanError::validation(ATTR_NAME, "the namespace name is required"));
        };

        let spec = NamespaceSpec {
            name: name.clone(),
            description: adopt(&self.description, prior.map(|s| s.description.as_str())),
            owner_email: adopt(&self.owner_email, prior.map(|s| s.owner_email.as_str())),
        };

        spec.validate().map_err(first_violation)?;
        Ok(spec)
    }
}

impl NamespaceSpec {
    /// Projects the mutable subset of an observed state.
    #[must_use]
    pub fn from_state(state: &ResourceState) -> Self {
        Self {
            name: state.name.clone(),
            description: state.description.clone(),
            owner_email: state.owner_email.clone(),
        }
    }
}

impl From<&NamespaceSpec> for ResourceSpec {
    fn from(spec: &NamespaceSpec) -> Self {
        Self {
            name: AttrValue::Known(spec.name.clone()),
            description: AttrValue::Known(spec.description.clone()),
            owner_email: AttrValue::Known(spec.owner_email.clone()),
        }
    }
}

fn adopt(value: &AttrValue<String>, prior: Option<&str>) -> String {
    match value.known() {
        Some(value) => value.clone(),
        None => prior.unwrap_or_default().to_string(),
    }
}

fn validate_namespace_name(name: &str) -> Result<(), ValidationError> {
    if name.chars().any(char::is_whitespace) {
        let mut error = ValidationError::new("whitespace");
        error.message = Some("must not contain whitespace".into());
        return Err(error);
    }
    Ok(())
}

fn validate_owner_email(owner_email: &str) -> Result<(), ValidationError> {
    if owner_email.is_empty() || owner_email.validate_email() {
        return Ok(());
    }
    let mut error = ValidationError::new("email");
    error.message = Some("must be a valid email address".into());
    Err(error)
}

/// Picks the first violation by attribute name so the result is stable.
fn first_violation(errors: ValidationErrors) -> PlanError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .find_map(|(field, violations)| {
            violations.first().map(|violation| {
                let message = violation
                    .message
                    .as_ref()
                    .map_or_else(|| violation.code.to_string(), ToString::to_string);
                PlanError::validation(field.to_string(), message)
            })
        })
        .unwrap_or_else(|| PlanError::validation(ATTR_NAME, "invalid namespace configuration"))
}
