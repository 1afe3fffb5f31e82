// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Temporal Provider
//!
//! Declarative, idempotent management of Temporal namespaces.
//!
//! ## Overview
//!
//! Namespaces are declared in a manifest and converged against a Temporal
//! frontend over gRPC:
//!
//! - Plan the create, update or delete that moves each namespace to its
//!   declared configuration
//! - Apply plans with bounded retries and cancellation
//! - Record the authoritative remote state between runs
//! - Import namespaces created elsewhere
//!
//! ## Architecture
//!
//! 1. **Desired state**: [`model::ResourceSpec`] entries in `temporal.provider.yaml`
//! 2. **Observed state**: [`model::ResourceState`] read through [`client::NamespaceApi`]
//! 3. **Planner**: computes one [`planner::PlannedAction`] per namespace
//! 4. **Controller**: enforces lifecycle rules and applies the plan
//!
//! ## Modules
//!
//! - [`client`]: Remote API contract, shared connection and gRPC client
//! - [`model`]: Desired and observed shapes, schemas and diagnostics
//! - [`planner`]: Plan computation, apply engine and retry policy
//! - [`reconciler`]: Per-namespace lifecycle controller
//! - [`driver`]: Manifest-wide reconciliation over recorded state
//! - [`config`]: Manifest parsing and provider settings
//! - [`state`]: Recorded state and locking
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! provider:
//!   host: localhost
//!   port: "7233"
//!
//! namespaces:
//!   - name: billing
//!     description: Billing workflows
//!     owner_email: billing@example.com
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod client;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod model;
pub mod planner;
pub mod reconciler;
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use client::{Connection, GrpcNamespaceClient, NamespaceApi};
pub use config::{ConfigParser, Manifest, ProviderConfig, SpecHasher};
pub use context::CallContext;
pub use driver::{ProviderDriver, RunReport};
pub use error::{ProviderError, Result};
pub use model::{Diagnostics, NamespaceSpec, ResourceSpec, ResourceState};
pub use planner::{ActionType, PlannedAction, Planner, ProviderPlan};
pub use reconciler::{NamespaceController, ReconcileOutcome};
pub use state::{LocalStateStore, ProviderState, StateStore};
