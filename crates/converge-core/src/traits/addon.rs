// # Addon API Trait
//
// Read access to an application's addons, used by the provisioning poller.
//
// ## Usage
//
// ```rust,ignore
// use converge_core::traits::AddonApi;
//
// let addon = client.show_addon("my-app", "ad-1234").await?;
// if addon.status.is_running() {
//     println!("{} is ready", addon.id);
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Lifecycle status reported for an addon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonStatus {
    /// Addon is being created
    Provisioning,
    /// Addon is ready to serve
    Running,
    /// Addon is suspended (billing, manual action)
    Suspended,
    /// Provisioning failed on the remote side
    Error,
    /// Any status this crate does not know about
    #[serde(other)]
    Unknown,
}

impl AddonStatus {
    /// Terminal success
    pub fn is_running(&self) -> bool {
        matches!(self, AddonStatus::Running)
    }

    /// Terminal failure
    pub fn is_failed(&self) -> bool {
        matches!(self, AddonStatus::Error)
    }
}

/// An addon attached to an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addon {
    /// Addon ID
    pub id: String,
    /// Application the addon belongs to
    pub app_id: String,
    /// Current lifecycle status
    pub status: AddonStatus,
    /// Addon provider (e.g. "postgresql", "redis")
    #[serde(default)]
    pub provider_id: Option<String>,
}

/// Trait for reading addon state
///
/// Implementations make exactly one remote call per method invocation and
/// never retry.
#[async_trait]
pub trait AddonApi: Send + Sync {
    /// Fetch the addon `addon_id` of application `app_id`
    async fn show_addon(&self, app_id: &str, addon_id: &str) -> Result<Addon, crate::Error>;
}
