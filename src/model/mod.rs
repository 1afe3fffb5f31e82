//! Resource model for Temporal namespaces.
//!
//! This module holds the desired and observed shapes of a namespace, the
//! declared schemas and the diagnostics surfaced to callers.

mod diagnostics;
mod schema;
mod spec;
mod state;
mod value;

pub use diagnostics::{Diagnostic, DiagnosticSeverity, Diagnostics};
pub use schema::{
    namespace_schema, provider_schema, Attribute, AttributeFlags, AttributeType, Schema,
    NAMESPACE_TYPE_NAME,
};
pub use spec::{NamespaceSpec, ResourceSpec, ATTR_DESCRIPTION, ATTR_NAME, ATTR_OWNER_EMAIL};
pub use state::{ArchivalState, FailoverRecord, NamespaceState, ResourceState};
pub use value::AttrValue;

#[cfg(test)]
pub(crate) use state::tests::sample_state;
