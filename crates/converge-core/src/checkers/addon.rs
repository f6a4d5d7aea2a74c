// # Addon Provisioning Checker
//
// Polls an addon until it reports `running`. A reported `error` status is a
// terminal failure; every other status keeps the poll going until the
// deadline.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::{Addon, AddonApi};
use crate::wait::{Condition, WaitSpec, wait_until};

/// Condition satisfied once the addon is running
pub struct AddonProvisioned<'a, A: AddonApi + ?Sized> {
    api: &'a A,
    app_id: String,
    addon_id: String,
    last: Option<Addon>,
}

impl<'a, A: AddonApi + ?Sized> AddonProvisioned<'a, A> {
    pub fn new(api: &'a A, app_id: impl Into<String>, addon_id: impl Into<String>) -> Self {
        Self {
            api,
            app_id: app_id.into(),
            addon_id: addon_id.into(),
            last: None,
        }
    }

    /// The entity as seen by the most recent check
    pub fn into_last(self) -> Option<Addon> {
        self.last
    }
}

#[async_trait]
impl<'a, A: AddonApi + ?Sized> Condition for AddonProvisioned<'a, A> {
    async fn check(&mut self) -> Result<bool> {
        let addon = self.api.show_addon(&self.app_id, &self.addon_id).await?;
        let status = addon.status;
        debug!(addon_id = %self.addon_id, ?status, "addon status");
        self.last = Some(addon);

        if status.is_running() {
            return Ok(true);
        }
        if status.is_failed() {
            return Err(Error::remote_failure(
                format!("addon {}", self.addon_id),
                "provisioning reported status error",
            ));
        }
        Ok(false)
    }
}

/// Block until the addon is running and return it
pub async fn wait_for_addon<A: AddonApi + ?Sized>(
    api: &A,
    cancel: &CancellationToken,
    spec: &WaitSpec,
    app_id: &str,
    addon_id: &str,
) -> Result<Addon> {
    let mut checker = AddonProvisioned::new(api, app_id, addon_id);
    wait_until(cancel, spec, &mut checker).await?;
    super::observed(checker.into_last(), "addon")
}
