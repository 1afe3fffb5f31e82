//! Remote namespace API contract.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{NamespaceSpec, ResourceState};

/// Typed operations against the remote namespace control plane.
///
/// Implementations must be safe to share across concurrent reconciliations.
/// Every error uses the crate taxonomy; a missing namespace is reported as
/// [`crate::error::RemoteError::NotFound`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NamespaceApi: Send + Sync {
    /// Registers a namespace and returns its authoritative state.
    async fn create(&self, spec: &NamespaceSpec) -> Result<ResourceState>;

    /// Fetches a namespace by remote identifier.
    async fn get(&self, id: &str) -> Result<ResourceState>;

    /// Fetches a namespace by name.
    async fn get_by_name(&self, name: &str) -> Result<ResourceState>;

    /// Updates the mutable attributes of a namespace and returns its
    /// authoritative state afterwards.
    async fn update(&self, id: &str, spec: &NamespaceSpec) -> Result<ResourceState>;

    /// Deletes a namespace by remote identifier.
    async fn delete(&self, id: &str) -> Result<()>;
}
