// # converge-core
//
// Reconciliation core for driving a remote platform-as-a-service API
// towards a desired state.
//
// ## Architecture Overview
//
// - **wait**: `wait_until`, a blocking poller racing a fixed tick against a
//   deadline and a cancellation token
// - **checkers**: conditions over one remote entity each (addon, database,
//   database feature, operation, firewall rule)
// - **diff**: `diff`, the added/deleted/modified partition of two mappings
// - **reconcile**: `Reconciler`, which applies a diff to an application's
//   environment and reads the result back
// - **traits**: the remote calls the core makes, implemented by
//   `converge-client-http`
//
// ## Design Principles
//
// 1. **No hidden retries**: every remote error reaches the caller
// 2. **Explicit cancellation**: every blocking call takes a `CancellationToken`
// 3. **Stateless primitives**: specs and diffs live for one operation only
// 4. **Library-First**: the CLI is a thin layer over this crate

pub mod checkers;
pub mod config;
pub mod diff;
pub mod error;
pub mod reconcile;
pub mod state;
pub mod traits;
pub mod wait;

/// An application's environment: variable name -> value
pub type Environment = std::collections::BTreeMap<String, String>;

// Re-export core types for convenience
pub use checkers::{
    restart_and_wait, wait_for_addon, wait_for_database, wait_for_database_feature,
    wait_for_firewall_rule, wait_for_operation,
};
pub use config::{ApiConfig, ConvergeConfig, PollersConfig, WaitSettings};
pub use diff::{KeyValueDiff, diff};
pub use error::{Error, Result};
pub use reconcile::{Converged, Reconciler};
pub use state::MemoryEnvironment;
pub use traits::{AddonApi, AppApi, DatabaseApi, EnvironmentApi, OperationApi, PlatformClient};
pub use wait::{Condition, WaitSpec, wait_until};

// Callers need the token type to call any blocking function
pub use tokio_util::sync::CancellationToken;
