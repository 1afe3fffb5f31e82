//! Observed namespace state.
//!
//! A [`ResourceState`] is only ever built from a remote response. Its computed
//! fields are never sourced from configuration and never patched locally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Lifecycle state of a namespace as reported by the remote side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NamespaceState {
    /// Active namespace.
    Registered,
    /// Namespace accepts no new workflows.
    Deprecated,
    /// Namespace is being or has been removed.
    Deleted,
}

/// Archival configuration state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ArchivalState {
    /// Not reported.
    #[default]
    Unspecified,
    /// Archival disabled.
    Disabled,
    /// Archival enabled.
    Enabled,
}

/// One entry of a namespace's failover history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailoverRecord {
    /// When the failover happened.
    pub failover_time: Option<DateTime<Utc>>,
    /// Failover version after the failover.
    pub failover_version: i64,
}

/// Authoritative state of one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceState {
    /// Remote-assigned identifier.
    pub id: String,
    /// Namespace name.
    pub name: String,
    /// Namespace description.
    pub description: String,
    /// Namespace owner email.
    pub owner_email: String,
    /// Lifecycle state.
    pub state: NamespaceState,
    /// Cluster currently active for the namespace.
    pub active_cluster_name: String,
    /// Clusters the namespace is replicated to, in remote order.
    pub clusters: Vec<String>,
    /// History archival state.
    pub history_archival_state: ArchivalState,
    /// Visibility archival state.
    pub visibility_archival_state: ArchivalState,
    /// Whether the namespace is global.
    pub is_global: bool,
    /// Current failover version.
    pub failover_version: i64,
    /// Failover history, in remote order.
    pub failover_history: Vec<FailoverRecord>,
}

impl ResourceState {
    /// Returns true if the remote side considers the namespace gone.
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.state == NamespaceState::Deleted
    }

    /// Renders the state as the attribute map declared by the resource schema.
    #[must_use]
    pub fn to_attributes(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "owner_email": self.owner_email,
            "state": self.state.to_string(),
            "active_cluster_name": self.active_cluster_name,
            "clusters": self.clusters,
            "history_archival_state": self.history_archival_state.to_string(),
            "visibility_archival_state": self.visibility_archival_state.to_string(),
            "is_global_namespace": self.is_global,
            "failover_version": self.failover_version,
            "failover_history": self
                .failover_history
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
        })
    }
}

impl std::fmt::Display for NamespaceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Registered => "Registered",
            Self::Deprecated => "Deprecated",
            Self::Deleted => "Deleted",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ArchivalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unspecified => "Unspecified",
            Self::Disabled => "Disabled",
            Self::Enabled => "Enabled",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for FailoverRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.failover_time {
            Some(time) => write!(f, "{}@{}", self.failover_version, time.to_rfc3339()),
            None => write!(f, "{}", self.failover_version),
        }
    }
}
