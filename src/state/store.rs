//! State store trait definition.

use async_trait::async_trait;

use crate::error::Result;

use super::lock::LockInfo;
use super::types::ProviderState;

/// Persistent storage for [`ProviderState`].
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Loads the state. Returns `None` if nothing was saved yet.
    async fn load(&self) -> Result<Option<ProviderState>>;

    /// Saves the state, replacing what was there.
    async fn save(&self, state: &ProviderState) -> Result<()>;

    /// Deletes the state and any lock.
    async fn delete(&self) -> Result<()>;

    /// Checks if state exists.
    async fn exists(&self) -> Result<bool>;

    /// Acquires the lock for `operation`.
    ///
    /// An empty `holder` generates one from the host and process.
    async fn acquire_lock(&self, holder: &str, operation: &str) -> Result<LockInfo>;

    /// Releases the lock if `lock_id` still holds it.
    async fn release_lock(&self, lock_id: &str) -> Result<()>;

    /// Returns the current lock, expired or not.
    async fn get_lock_info(&self) -> Result<Option<LockInfo>>;

    /// Checks if a live lock is held.
    async fn is_locked(&self) -> Result<bool>;

    /// Backend name for display.
    fn backend_type(&self) -> &'static str;
}
