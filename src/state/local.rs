//! File-backed state store.
//!
//! State lives in `.temporal-provider/state.json` next to the manifest by
//! default. Writes go to a temporary file that is renamed into place, so a
//! crash mid-write leaves the previous state intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, Result, StateError};

use super::lock::{generate_holder_id, LockInfo, LOCK_EXPIRY_SECS};
use super::store::StateStore;
use super::types::ProviderState;

/// Default state directory name.
pub const STATE_DIR: &str = ".temporal-provider";

const STATE_FILE: &str = "state.json";
const LOCK_FILE: &str = "state.lock";

/// Local file-based state store.
#[derive(Debug, Clone)]
pub struct LocalStateStore {
    base_dir: PathBuf,
    state_path: PathBuf,
    lock_path: PathBuf,
}

fn corrupted(context: &'static str) -> impl FnOnce(std::io::Error) -> ProviderError {
    move |e| {
        StateError::Corrupted {
            message: format!("{context}: {e}"),
        }
        .into()
    }
}

fn lock_failed(context: &'static str) -> impl FnOnce(std::io::Error) -> ProviderError {
    move |e| {
        StateError::LockFailed {
            message: format!("{context}: {e}"),
        }
        .into()
    }
}

async fn write_file(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(content).await?;
    file.sync_all().await
}

impl LocalStateStore {
    /// Creates a store under `<dir>/.temporal-provider`.
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::with_base_dir(dir.as_ref().join(STATE_DIR))
    }

    /// Creates a store keeping its files directly in `base_dir`.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            state_path: base_dir.join(STATE_FILE),
            lock_path: base_dir.join(LOCK_FILE),
            base_dir,
        }
    }

    /// Creates a store for an explicit state file path.
    #[must_use]
    pub fn with_state_path(state_path: impl Into<PathBuf>) -> Self {
        let state_path = state_path.into();
        let base_dir = state_path
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        Self {
            lock_path: base_dir.join(LOCK_FILE),
            base_dir,
            state_path,
        }
    }

    /// Path of the state file.
    #[must_use]
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    async fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            debug!("Creating state directory: {}", self.base_dir.display());
            fs::create_dir_all(&self.base_dir)
                .await
                .map_err(lock_failed("Failed to create state directory"))?;
        }
        Ok(())
    }

    async fn read_lock_file(&self) -> Result<Option<LockInfo>> {
        if !self.lock_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.lock_path)
            .await
            .map_err(corrupted("Failed to read lock file"))?;
        let lock = serde_json::from_str(&content).map_err(|e| StateError::Corrupted {
            message: format!("Failed to parse lock file: {e}"),
        })?;

        Ok(Some(lock))
    }

    async fn delete_lock_file(&self) -> Result<()> {
        if self.lock_path.exists() {
            fs::remove_file(&self.lock_path)
                .await
                .map_err(lock_failed("Failed to delete lock file"))?;
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load(&self) -> Result<Option<ProviderState>> {
        if !self.state_path.exists() {
            debug!("State file does not exist: {}", self.state_path.display());
            return Ok(None);
        }

        debug!("Loading state from: {}", self.state_path.display());

        let content = fs::read_to_string(&self.state_path)
            .await
            .map_err(corrupted("Failed to read state file"))?;
        let state: ProviderState =
            serde_json::from_str(&content).map_err(|e| StateError::Corrupted {
                message: format!("Failed to parse state file: {e}"),
            })?;
        state.check_version()?;

        Ok(Some(state))
    }

    async fn save(&self, state: &ProviderState) -> Result<()> {
        self.ensure_dir().await?;

        let content = serde_json::to_string_pretty(state)
            .map_err(|e| StateError::serialization(format!("Failed to serialize state: {e}")))?;

        let temp_path = self.state_path.with_extension("tmp");
        write_file(&temp_path, content.as_bytes())
            .await
            .map_err(|e| StateError::serialization(format!("Failed to write state file: {e}")))?;
        fs::rename(&temp_path, &self.state_path)
            .await
            .map_err(|e| StateError::serialization(format!("Failed to replace state file: {e}")))?;

        info!(
            namespaces = state.namespaces.len(),
            "Saved state to {}",
            self.state_path.display()
        );
        Ok(())
    }

    async fn delete(&self) -> Result<()> {
        if self.state_path.exists() {
            info!("Deleting state file: {}", self.state_path.display());
            fs::remove_file(&self.state_path)
                .await
                .map_err(corrupted("Failed to delete state file"))?;
        }
        self.delete_lock_file().await
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.state_path.exists())
    }

    async fn acquire_lock(&self, holder: &str, operation: &str) -> Result<LockInfo> {
        if let Some(existing) = self.read_lock_file().await? {
            if !existing.is_expired() {
                return Err(StateError::LockedByOther {
                    holder: existing.holder,
                    since: existing.acquired_at.to_rfc3339(),
                }
                .into());
            }
            warn!(holder = %existing.holder, "Taking over expired state lock");
        }

        let holder = if holder.is_empty() {
            generate_holder_id()
        } else {
            holder.to_string()
        };
        let lock = LockInfo::new(&holder, operation);

        self.ensure_dir().await?;
        let content = serde_json::to_string_pretty(&lock)
            .map_err(|e| StateError::serialization(format!("Failed to serialize lock: {e}")))?;
        write_file(&self.lock_path, content.as_bytes())
            .await
            .map_err(lock_failed("Failed to write lock file"))?;

        info!(
            lock_id = %lock.lock_id,
            operation,
            "Acquired state lock (expires in {LOCK_EXPIRY_SECS}s)"
        );
        Ok(lock)
    }

    async fn release_lock(&self, lock_id: &str) -> Result<()> {
        match self.read_lock_file().await? {
            Some(existing) if existing.lock_id == lock_id => {
                self.delete_lock_file().await?;
                debug!("Released state lock: {lock_id}");
            }
            Some(existing) => {
                warn!(
                    "Not releasing state lock held by {}: expected lock {lock_id}, found {}",
                    existing.holder, existing.lock_id
                );
            }
            None => {}
        }
        Ok(())
    }

    async fn get_lock_info(&self) -> Result<Option<LockInfo>> {
        self.read_lock_file().await
    }

    async fn is_locked(&self) -> Result<bool> {
        Ok(self
            .read_lock_file()
            .await?
            .is_some_and(|lock| !lock.is_expired()))
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::sample_state;
    use tempfile::TempDir;

    fn create_test_store() -> (LocalStateStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::in_dir(temp_dir.path());
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _temp) = create_test_store();

        let mut state = ProviderState::new();
        state.upsert(sample_state("billing"), Some(String::from("fingerprint")));
        store.save(&state).await.expect("Failed to save state");

        let loaded = store
            .load()
            .await
            .expect("Failed to load state")
            .expect("State should exist");

        assert_eq!(loaded, state);
        assert!(store.state_path().ends_with("state.json"));
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _temp) = create_test_store();

        assert!(store.load().await.expect("Load should not fail").is_none());
        assert!(!store.exists().await.expect("exists check failed"));
    }

    #[tokio::test]
    async fn test_corrupted_state() {
        let (store, temp) = create_test_store();
        std::fs::create_dir_all(temp.path().join(STATE_DIR)).expect("state dir");
        std::fs::write(store.state_path(), "{not json").expect("write garbage");

        let err = store.load().await.expect_err("corrupted");
        assert_eq!(err.kind(), ErrorKind::State);
    }

    #[tokio::test]
    async fn test_lock_acquire_release() {
        let (store, _temp) = create_test_store();

        let lock = store
            .acquire_lock("test-holder", "apply")
            .await
            .expect("Failed to acquire lock");
        assert!(store.is_locked().await.expect("is_locked failed"));

        store
            .release_lock(&lock.lock_id)
            .await
            .expect("Failed to release lock");
        assert!(!store.is_locked().await.expect("is_locked failed"));
    }

    #[tokio::test]
    async fn test_lock_conflict() {
        let (store, _temp) = create_test_store();

        let _held = store
            .acquire_lock("holder-1", "apply")
            .await
            .expect("Failed to acquire first lock");

        let err = store
            .acquire_lock("holder-2", "destroy")
            .await
            .expect_err("already locked");
        assert!(matches!(
            err,
            ProviderError::State(StateError::LockedByOther { ref holder, .. }) if holder == "holder-1"
        ));
    }

    #[tokio::test]
    async fn test_foreign_release_keeps_lock() {
        let (store, _temp) = create_test_store();

        store
            .acquire_lock("", "apply")
            .await
            .expect("Failed to acquire lock");
        store
            .release_lock("someone-else")
            .await
            .expect("release is a no-op");

        assert!(store.is_locked().await.expect("is_locked failed"));
        let info = store
            .get_lock_info()
            .await
            .expect("lock info")
            .expect("lock held");
        assert!(!info.holder.is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_state_and_lock() {
        let (store, _temp) = create_test_store();

        store
            .save(&ProviderState::new())
            .await
            .expect("Failed to save state");
        store
            .acquire_lock("holder", "destroy")
            .await
            .expect("Failed to acquire lock");

        store.delete().await.expect("Failed to delete");
        assert!(!store.exists().await.expect("exists check failed"));
        assert!(!store.is_locked().await.expect("is_locked failed"));
    }
}
