//! Planning and applying namespace changes.
//!
//! This module computes the action that moves a namespace to its desired
//! configuration and executes it against the remote API with bounded retries.

mod diff;
mod executor;
mod plan;
mod retry;

pub use diff::{drift, mutable_changes, DiffDetail};
pub use executor::{ApplyEngine, ApplyOutcome};
pub use plan::{ActionType, PlannedAction, Planner, ProviderPlan};
pub use retry::RetryPolicy;
