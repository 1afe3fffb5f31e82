//! Error types for the Temporal provider.
//!
//! This module provides the error hierarchy for every stage of a
//! reconciliation: provider configuration, the remote connection, remote API
//! calls, planning, the resource lifecycle and local state management.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::{Diagnostic, Diagnostics};

/// The main error type for the Temporal provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The remote channel is unavailable.
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// The remote control plane rejected or failed a call.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// The operation was cancelled or its deadline elapsed.
    #[error("Operation cancelled: {reason}")]
    Cancelled {
        /// Why the operation stopped.
        reason: String,
    },

    /// Lifecycle precondition or outcome errors.
    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// State management errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// An error attributed to a specific namespace.
    #[error("namespace '{name}': {source}")]
    Resource {
        /// Natural key of the namespace.
        name: String,
        /// The underlying error.
        #[source]
        source: Box<ProviderError>,
    },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The manifest file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The manifest file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Provider configuration was rejected.
    #[error("{} provider configuration error(s): {}", .diagnostics.error_count(), .diagnostics.summary())]
    Rejected {
        /// Attribute-scoped diagnostics explaining the rejection.
        diagnostics: Diagnostics,
    },

    /// Duplicate namespace definition in the manifest.
    #[error("Duplicate namespace name: {name}")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },
}

/// Errors establishing or using the shared remote channel.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The endpoint could not be parsed.
    #[error("Invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint {
        /// The endpoint that was rejected.
        endpoint: String,
        /// Description of the problem.
        message: String,
    },

    /// The endpoint could not be reached while connecting.
    #[error("Unable to reach Temporal frontend at {endpoint}: {message}")]
    Unreachable {
        /// The endpoint that was dialed.
        endpoint: String,
        /// Transport error message.
        message: String,
    },

    /// A call was made before the channel was established or after shutdown.
    #[error("Temporal client connection is not established")]
    NotEstablished,
}

/// Errors reported by the remote control plane.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The namespace does not exist.
    #[error("Namespace not found: {message}")]
    NotFound {
        /// Message from the server.
        message: String,
    },

    /// The namespace already exists.
    #[error("Namespace already exists: {message}")]
    AlreadyExists {
        /// Message from the server.
        message: String,
    },

    /// The request was rejected as invalid.
    #[error("Validation failed: {message}")]
    Validation {
        /// Message from the server.
        message: String,
    },

    /// The caller is not allowed to perform the call.
    #[error("Permission denied: {message}")]
    PermissionDenied {
        /// Message from the server.
        message: String,
    },

    /// The service is temporarily unavailable.
    #[error("Service unavailable: {message}")]
    Unavailable {
        /// Message from the server or transport.
        message: String,
    },

    /// Any other server-side failure.
    #[error("Internal server error ({code}): {message}")]
    Internal {
        /// gRPC status code name.
        code: String,
        /// Message from the server.
        message: String,
    },

    /// The server answered with something that cannot be interpreted.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Planning errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// Input values are not yet known; planning must wait.
    #[error("Planning deferred until values are known for: {}", .attributes.join(", "))]
    Deferred {
        /// Attributes holding unknown values.
        attributes: Vec<String>,
    },

    /// An input value is invalid.
    #[error("Invalid value for '{attribute}': {message}")]
    Validation {
        /// Attribute that failed validation.
        attribute: String,
        /// Description of the failure.
        message: String,
    },

    /// An attribute that cannot change after creation was changed.
    #[error("Attribute '{attribute}' cannot change after creation ('{from}' -> '{to}')")]
    ImmutableAttribute {
        /// The immutable attribute.
        attribute: String,
        /// Value recorded in state.
        from: String,
        /// Value requested by the configuration.
        to: String,
    },
}

/// Lifecycle precondition and outcome errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Create was requested for a namespace that already has state.
    #[error("Namespace '{name}' already exists in state (id: {id})")]
    AlreadyExists {
        /// Natural key.
        name: String,
        /// Remote identifier recorded in state.
        id: String,
    },

    /// Import found nothing under the given identifier.
    #[error("Cannot import non-existent namespace with id '{id}'")]
    ImportNotFound {
        /// Identifier supplied for import.
        id: String,
    },

    /// The namespace disappeared remotely between reconciliations.
    #[error("Namespace with id '{id}' no longer exists remotely and must be recreated")]
    ResourceVanished {
        /// Identifier recorded in state.
        id: String,
    },

    /// The planner chose an action the operation cannot perform.
    #[error("Expected a {expected} action but the plan produced {found}")]
    UnexpectedAction {
        /// Action the operation expected.
        expected: String,
        /// Action the planner produced.
        found: String,
    },
}

/// State management errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// State lock acquisition failed.
    #[error("Failed to acquire state lock: {message}")]
    LockFailed {
        /// Description of the lock failure.
        message: String,
    },

    /// State lock is held by another process.
    #[error("State is locked by another process (lock holder: {holder}, since: {since})")]
    LockedByOther {
        /// Identifier of the lock holder.
        holder: String,
        /// When the lock was acquired.
        since: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// State version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected state version.
        expected: String,
        /// Found state version.
        found: String,
    },
}

/// Coarse classification of a [`ProviderError`], looking through resource
/// context wrappers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid provider configuration.
    Configuration,
    /// Remote channel unavailable.
    Connection,
    /// Remote resource not found.
    NotFound,
    /// Resource already exists (remotely or in state).
    AlreadyExists,
    /// Input rejected locally or remotely.
    Validation,
    /// Caller lacks permission.
    PermissionDenied,
    /// Transient remote unavailability.
    Unavailable,
    /// Other remote failures.
    Remote,
    /// Planning must wait for unknown values.
    PlanDeferred,
    /// Operation cancelled.
    Cancelled,
    /// Import target does not exist.
    ImportNotFound,
    /// Resource vanished remotely.
    Drift,
    /// Local state problems.
    State,
    /// Anything else.
    Internal,
}

/// Result type alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

impl ProviderError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Creates a cancellation error.
    #[must_use]
    pub fn cancelled(reason: impl Into<String>) -> Self {
        Self::Cancelled {
            reason: reason.into(),
        }
    }

    /// Attaches namespace identity to this error.
    ///
    /// Errors already attributed to a namespace are returned unchanged.
    #[must_use]
    pub fn with_resource(self, name: &str) -> Self {
        match self {
            Self::Resource { .. } => self,
            other => Self::Resource {
                name: name.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Returns the innermost error, skipping resource context.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Resource { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns the namespace this error is attributed to, if any.
    #[must_use]
    pub fn resource_name(&self) -> Option<&str> {
        match self {
            Self::Resource { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Classifies this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resource { source, .. } => source.kind(),
            Self::Config(_) => ErrorKind::Configuration,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Remote(remote) => match remote {
                RemoteError::NotFound { .. } => ErrorKind::NotFound,
                RemoteError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
                RemoteError::Validation { .. } => ErrorKind::Validation,
                RemoteError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
                RemoteError::Unavailable { .. } => ErrorKind::Unavailable,
                RemoteError::Internal { .. } | RemoteError::InvalidResponse { .. } => {
                    ErrorKind::Remote
                }
            },
            Self::Plan(PlanError::Deferred { .. }) => ErrorKind::PlanDeferred,
            Self::Plan(_) => ErrorKind::Validation,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Lifecycle(lifecycle) => match lifecycle {
                LifecycleError::AlreadyExists { .. } => ErrorKind::AlreadyExists,
                LifecycleError::ImportNotFound { .. } => ErrorKind::ImportNotFound,
                LifecycleError::ResourceVanished { .. } => ErrorKind::Drift,
                LifecycleError::UnexpectedAction { .. } => ErrorKind::Internal,
            },
            Self::State(_) => ErrorKind::State,
            Self::Io(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Resource { source, .. } => source.is_retryable(),
            Self::Remote(remote) => remote.is_transient(),
            _ => false,
        }
    }

    /// Returns true if a remote call reported that the resource is missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound)
    }

    /// Converts this error into caller-visible diagnostics.
    ///
    /// Configuration rejections expand into their attribute-scoped entries;
    /// every other error becomes a single entry, attribute-scoped when the
    /// fault traces to one attribute and resource-scoped otherwise.
    #[must_use]
    pub fn to_diagnostics(&self) -> Diagnostics {
        if let Self::Config(ConfigError::Rejected { diagnostics }) = self.root() {
            return diagnostics.clone();
        }

        let mut diagnostic = Diagnostic::error(self.summary()).with_detail(self.root().to_string());

        match self.root() {
            Self::Plan(
                PlanError::Validation { attribute, .. }
                | PlanError::ImmutableAttribute { attribute, .. },
            ) => {
                diagnostic = diagnostic.with_attribute(attribute.clone());
            }
            Self::Plan(PlanError::Deferred { attributes }) if attributes.len() == 1 => {
                diagnostic = diagnostic.with_attribute(attributes[0].clone());
            }
            _ => {}
        }

        if let Some(name) = self.resource_name() {
            diagnostic = diagnostic.with_resource(name);
        }

        Diagnostics::from(vec![diagnostic])
    }

    /// Short, human-readable summary used as the diagnostic headline.
    fn summary(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Configuration => "Invalid Provider Configuration",
            ErrorKind::Connection => "Temporal Client Unavailable",
            ErrorKind::NotFound => "Namespace Not Found",
            ErrorKind::AlreadyExists => "Namespace Already Exists",
            ErrorKind::Validation => "Invalid Namespace Configuration",
            ErrorKind::PermissionDenied => "Permission Denied",
            ErrorKind::Unavailable => "Temporal Service Unavailable",
            ErrorKind::Remote => "Temporal Client Error",
            ErrorKind::PlanDeferred => "Namespace Values Not Yet Known",
            ErrorKind::Cancelled => "Operation Cancelled",
            ErrorKind::ImportNotFound => "Cannot Import Namespace",
            ErrorKind::Drift => "Namespace Removed Outside Of Configuration",
            ErrorKind::State => "State Error",
            ErrorKind::Internal => "Internal Provider Error",
        }
    }
}

impl RemoteError {
    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates an unavailable (transient) error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Returns true for errors worth retrying.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

impl PlanError {
    /// Creates a validation error for a specific attribute.
    #[must_use]
    pub fn validation(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            attribute: attribute.into(),
            message: message.into(),
        }
    }
}

impl StateError {
    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_looks_through_resource_context() {
        let err = ProviderError::from(RemoteError::unavailable("frontend restarting"))
            .with_resource("billing");

        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.is_retryable());
        assert_eq!(err.resource_name(), Some("billing"));
        assert_eq!(
            err.to_string(),
            "namespace 'billing': Remote error: Service unavailable: frontend restarting"
        );
    }

    #[test]
    fn test_with_resource_does_not_nest() {
        let err = ProviderError::cancelled("deadline")
            .with_resource("billing")
            .with_resource("other");

        assert_eq!(err.resource_name(), Some("billing"));
        assert!(matches!(err.root(), ProviderError::Cancelled { .. }));
    }

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(RemoteError::unavailable("x").is_transient());
        assert!(!RemoteError::not_found("x").is_transient());
        assert!(!RemoteError::validation("x").is_transient());
        assert!(!ProviderError::Connection(ConnectionError::NotEstablished).is_retryable());
    }

    #[test]
    fn test_plan_error_diagnostic_is_attribute_scoped() {
        let err = ProviderError::from(PlanError::validation("owner_email", "not an email"))
            .with_resource("billing");
        let diagnostics = err.to_diagnostics();

        assert_eq!(diagnostics.len(), 1);
        let diagnostic = &diagnostics.as_slice()[0];
        assert_eq!(diagnostic.attribute.as_deref(), Some("owner_email"));
        assert_eq!(diagnostic.resource.as_deref(), Some("billing"));
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_remote_error_diagnostic_is_resource_scoped() {
        let err = ProviderError::from(RemoteError::PermissionDenied {
            message: String::from("no access"),
        })
        .with_resource("billing");
        let diagnostics = err.to_diagnostics();
        let diagnostic = &diagnostics.as_slice()[0];

        assert_eq!(diagnostic.summary, "Permission Denied");
        assert!(diagnostic.attribute.is_none());
        assert_eq!(diagnostic.resource.as_deref(), Some("billing"));
    }

    #[test]
    fn test_lifecycle_kinds() {
        let err = ProviderError::from(LifecycleError::ImportNotFound {
            id: String::from("ns-123"),
        });
        assert_eq!(err.kind(), ErrorKind::ImportNotFound);

        let err = ProviderError::from(LifecycleError::ResourceVanished {
            id: String::from("ns-123"),
        });
        assert_eq!(err.kind(), ErrorKind::Drift);
    }
}
