//! Recorded provider state.
//!
//! The state file is the host's memory between runs: the authoritative state
//! last observed for every managed namespace, keyed by name.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StateError;
use crate::model::ResourceState;

/// Current version of the state format.
pub const STATE_VERSION: &str = "1";

const MAX_HISTORY: usize = 100;

/// Everything the provider remembers about managed namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderState {
    /// State format version.
    pub version: String,
    /// Endpoint the namespaces were last reconciled against.
    #[serde(default)]
    pub endpoint: String,
    /// Fingerprint of the last applied manifest.
    #[serde(default)]
    pub manifest_hash: String,
    /// Managed namespaces by name.
    #[serde(default)]
    pub namespaces: BTreeMap<String, NamespaceRecord>,
    /// When the state last changed.
    pub last_updated: DateTime<Utc>,
    /// Recent operations, oldest first.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// One managed namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRecord {
    /// Authoritative state as last returned by the remote side.
    pub state: ResourceState,
    /// Fingerprint of the spec last applied, empty for imports.
    #[serde(default)]
    pub fingerprint: String,
    /// When the namespace first entered the state.
    pub recorded_at: DateTime<Utc>,
    /// When the record last changed.
    pub updated_at: DateTime<Utc>,
}

/// Operations recorded in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateOperation {
    /// Manifest applied.
    Apply,
    /// Existing namespace adopted.
    Import,
    /// Managed namespaces deleted.
    Destroy,
    /// Namespace dropped from state without a remote call.
    Forget,
}

/// A single entry in the operation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the operation finished.
    pub timestamp: DateTime<Utc>,
    /// What was done.
    pub operation: StateOperation,
    /// Namespaces touched.
    pub namespaces: Vec<String>,
    /// Whether every namespace succeeded.
    pub success: bool,
    /// First error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for ProviderState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            endpoint: String::new(),
            manifest_hash: String::new(),
            namespaces: BTreeMap::new(),
            last_updated: Utc::now(),
            history: Vec::new(),
        }
    }

    /// Rejects state written by an incompatible format version.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::VersionMismatch`] on any other version.
    pub fn check_version(&self) -> Result<(), StateError> {
        if self.version == STATE_VERSION {
            Ok(())
        } else {
            Err(StateError::VersionMismatch {
                expected: STATE_VERSION.to_string(),
                found: self.version.clone(),
            })
        }
    }

    /// Returns the recorded state of a namespace.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResourceState> {
        self.namespaces.get(name).map(|r| &r.state)
    }

    /// Returns the full record of a namespace.
    #[must_use]
    pub fn record(&self, name: &str) -> Option<&NamespaceRecord> {
        self.namespaces.get(name)
    }

    /// Stores the authoritative state returned by a successful operation.
    pub fn upsert(&mut self, state: ResourceState, fingerprint: Option<String>) {
        let now = Utc::now();
        let name = state.name.clone();
        let recorded_at = self
            .namespaces
            .get(&name)
            .map_or(now, |existing| existing.recorded_at);

        self.namespaces.insert(
            name,
            NamespaceRecord {
                state,
                fingerprint: fingerprint.unwrap_or_default(),
                recorded_at,
                updated_at: now,
            },
        );
        self.last_updated = now;
    }

    /// Drops a namespace from state.
    pub fn remove(&mut self, name: &str) -> Option<NamespaceRecord> {
        let removed = self.namespaces.remove(name);
        if removed.is_some() {
            self.last_updated = Utc::now();
        }
        removed
    }

    /// Returns the managed namespace names in order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.namespaces.keys().map(String::as_str).collect()
    }

    /// Appends a history entry, keeping only the most recent ones.
    pub fn add_history(&mut self, entry: HistoryEntry) {
        if self.history.len() >= MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(entry);
    }
}

impl HistoryEntry {
    /// Creates a history entry for an operation over `namespaces`.
    #[must_use]
    pub fn new(operation: StateOperation, namespaces: Vec<String>, error: Option<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            namespaces,
            success: error.is_none(),
            error,
        }
    }
}

impl std::fmt::Display for StateOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            Self::Apply => "apply",
            Self::Import => "import",
            Self::Destroy => "destroy",
            Self::Forget => "forget",
        };
        write!(f, "{op}")
    }
}
