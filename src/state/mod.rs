//! Persistent state for managed namespaces.
//!
//! The state records the authoritative remote state last observed for each
//! namespace, plus a lock guarding mutating commands.

mod local;
mod lock;
mod store;
mod types;

pub use local::{LocalStateStore, STATE_DIR};
pub use lock::{generate_holder_id, LockInfo, LOCK_EXPIRY_SECS};
pub use store::StateStore;
pub use types::{
    HistoryEntry, NamespaceRecord, ProviderState, StateOperation, STATE_VERSION,
};
