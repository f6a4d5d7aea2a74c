//! Condition checkers for remote provisioning flows
//!
//! Each checker wraps exactly one remote "show" or "list" call and
//! classifies the answer for [`wait_until`](crate::wait::wait_until):
//!
//! - terminal success → `Ok(true)`
//! - terminal failure → `Err(Error::RemoteFailure { .. })`
//! - anything else    → `Ok(false)`, poll again
//!
//! Hard API errors (authentication, malformed request, server errors) are
//! always terminal and are returned as-is. The only answer some checkers
//! downgrade to "not yet" is `Error::NotFound`, for entities that may not be
//! visible right after their creation call.
//!
//! Checkers keep the last entity they observed so the caller gets the final
//! remote state back without an extra request. The `wait_for_*` functions
//! bundle a checker with [`wait_until`](crate::wait::wait_until).

pub mod addon;
pub mod database;
pub mod firewall;
pub mod operation;

pub use addon::{AddonProvisioned, wait_for_addon};
pub use database::{DatabaseFeatureActivated, DatabaseProvisioned, wait_for_database, wait_for_database_feature};
pub use firewall::{FirewallRuleVisible, wait_for_firewall_rule};
pub use operation::{OperationFinished, restart_and_wait, wait_for_operation};

use crate::error::{Error, Result};

/// Unwrap the entity a checker recorded on its successful check
pub(crate) fn observed<T>(last: Option<T>, what: &str) -> Result<T> {
    last.ok_or_else(|| Error::Other(format!("{what} was not observed while waiting")))
}
