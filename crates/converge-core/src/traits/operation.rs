// # Operation API Trait
//
// Long-running platform operations (restarts, scaling) are tracked by a
// handle: the URL returned in the `Location` header of the call that
// started them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Status of a long-running operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Pending,
    Running,
    Done,
    Error,
    #[serde(other)]
    Unknown,
}

/// A long-running operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation ID
    pub id: String,
    /// Operation type (e.g. "restart", "scale")
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Current status
    pub status: OperationStatus,
    /// Error detail, set when `status` is `Error`
    #[serde(default)]
    pub error: Option<String>,
}

/// Trait for following long-running operations
#[async_trait]
pub trait OperationApi: Send + Sync {
    /// Fetch an operation by its tracking handle
    async fn show_operation(&self, location: &str) -> Result<Operation, crate::Error>;
}

/// Trait for application-level actions that start operations
#[async_trait]
pub trait AppApi: Send + Sync {
    /// Restart every container of the application
    ///
    /// Returns the tracking handle of the restart operation, or `None` when
    /// the platform did not start one (e.g. the app has no running container).
    async fn restart_app(&self, app_id: &str) -> Result<Option<String>, crate::Error>;
}
