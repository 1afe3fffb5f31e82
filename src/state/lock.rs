//! State locking.
//!
//! A lock file guards the state while a mutating command runs. Locks expire so
//! a crashed run cannot wedge the state forever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lock expiry duration in seconds.
pub const LOCK_EXPIRY_SECS: i64 = 300;

/// Information about a held lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Unique lock identifier.
    pub lock_id: String,
    /// Who holds the lock.
    pub holder: String,
    /// Command the lock was taken for.
    #[serde(default)]
    pub operation: String,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
    /// When the lock expires.
    pub expires_at: DateTime<Utc>,
}

impl LockInfo {
    /// Creates lock info for `holder`, expiring after [`LOCK_EXPIRY_SECS`].
    #[must_use]
    pub fn new(holder: &str, operation: &str) -> Self {
        let now = Utc::now();
        Self {
            lock_id: Uuid::new_v4().to_string(),
            holder: holder.to_string(),
            operation: operation.to_string(),
            acquired_at: now,
            expires_at: now + chrono::Duration::seconds(LOCK_EXPIRY_SECS),
        }
    }

    /// Checks if the lock has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Seconds until expiry, never negative.
    #[must_use]
    pub fn remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

/// Generates a holder identifier for the current process.
#[must_use]
pub fn generate_holder_id() -> String {
    let hostname = hostname::get()
        .map_or_else(|_| String::from("unknown"), |h| h.to_string_lossy().to_string());
    let pid = std::process::id();
    let suffix = Uuid::new_v4().simple().to_string();

    format!("{hostname}-{pid}-{}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_lock_is_live() {
        let lock = LockInfo::new("ci-runner", "apply");
        assert_eq!(lock.holder, "ci-runner");
        assert_eq!(lock.operation, "apply");
        assert!(!lock.is_expired());
        assert!(lock.remaining_secs() > 0);
    }

    #[test]
    fn test_expired_lock() {
        let mut lock = LockInfo::new("ci-runner", "destroy");
        lock.expires_at = Utc::now() - chrono::Duration::seconds(1);

        assert!(lock.is_expired());
        assert_eq!(lock.remaining_secs(), 0);
    }

    #[test]
    fn test_holder_ids_are_unique() {
        let first = generate_holder_id();
        let second = generate_holder_id();

        assert_ne!(first, second);
        assert!(first.contains(&std::process::id().to_string()));
    }
}
