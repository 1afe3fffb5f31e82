//! Field-level comparison of desired and observed namespaces.
//!
//! Only the configurable fields take part. Computed fields come from the
//! remote side and never produce a difference.

use serde::Serialize;

use crate::model::{NamespaceSpec, ResourceState, ATTR_DESCRIPTION, ATTR_OWNER_EMAIL};

/// Detail about a specific difference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffDetail {
    /// Field that differs.
    pub field: String,
    /// Value currently observed.
    pub old_value: String,
    /// Value requested.
    pub new_value: String,
}

/// Compares the mutable fields of `desired` against `observed`.
///
/// Results are in schema order.
#[must_use]
pub fn mutable_changes(desired: &NamespaceSpec, observed: &ResourceState) -> Vec<DiffDetail> {
    [
        (ATTR_DESCRIPTION, &observed.description, &desired.description),
        (ATTR_OWNER_EMAIL, &observed.owner_email, &desired.owner_email),
    ]
    .into_iter()
    .filter(|(_, old, new)| old != new)
    .map(|(field, old, new)| DiffDetail {
        field: field.to_string(),
        old_value: old.clone(),
        new_value: new.clone(),
    })
    .collect()
}

/// Reports fields where an authoritative response disagrees with what was
/// requested.
///
/// `old_value` holds what the remote side reported and `new_value` what was
/// requested.
#[must_use]
pub fn drift(requested: &NamespaceSpec, authoritative: &ResourceState) -> Vec<DiffDetail> {
    mutable_changes(requested, authoritative)
}

impl std::fmt::Display for DiffDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {:?} -> {:?}", self.field, self.old_value, self.new_value)
    }
}
