//! Remote platform traits
//!
//! This module defines the calls the converge core makes against the remote
//! platform. Implementations issue exactly one request per call and never
//! retry; classification of the result is left to the callers.
//!
//! - [`AddonApi`]: Show an addon's status
//! - [`DatabaseApi`]: Show a database and list its firewall rules
//! - [`OperationApi`] / [`AppApi`]: Start and follow long-running operations
//! - [`EnvironmentApi`]: List, unset and batch-set environment variables

pub mod addon;
pub mod database;
pub mod environment;
pub mod operation;

pub use addon::{Addon, AddonApi, AddonStatus};
pub use database::{Database, DatabaseApi, DatabaseFeature, DatabaseStatus, FeatureStatus, FirewallRule};
pub use environment::{EnvironmentApi, Variable, VariableInput, to_environment};
pub use operation::{AppApi, Operation, OperationApi, OperationStatus};

/// Everything a full platform client provides
pub trait PlatformClient: AddonApi + DatabaseApi + OperationApi + AppApi + EnvironmentApi {}

impl<T> PlatformClient for T where T: AddonApi + DatabaseApi + OperationApi + AppApi + EnvironmentApi {}
