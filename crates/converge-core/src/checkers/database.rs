// # Database Checkers
//
// Two pollers over the same `show_database` call:
//
// - `DatabaseProvisioned`: waits for status `running`. The database may not
//   be visible right after creation, so `NotFound` counts as "not yet". If it
//   never shows up, the caller gets the wait's timeout error, not NotFound.
// - `DatabaseFeatureActivated`: waits for a named feature to leave
//   `PENDING`. `ACTIVATED` is success, `FAILED` is a terminal failure.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::{Database, DatabaseApi, DatabaseStatus, FeatureStatus};
use crate::wait::{Condition, WaitSpec, wait_until};

/// Condition satisfied once the database is running
pub struct DatabaseProvisioned<'a, D: DatabaseApi + ?Sized> {
    api: &'a D,
    app_id: String,
    addon_id: String,
    last: Option<Database>,
}

impl<'a, D: DatabaseApi + ?Sized> DatabaseProvisioned<'a, D> {
    pub fn new(api: &'a D, app_id: impl Into<String>, addon_id: impl Into<String>) -> Self {
        Self {
            api,
            app_id: app_id.into(),
            addon_id: addon_id.into(),
            last: None,
        }
    }

    /// The entity as seen by the most recent check
    pub fn into_last(self) -> Option<Database> {
        self.last
    }
}

#[async_trait]
impl<'a, D: DatabaseApi + ?Sized> Condition for DatabaseProvisioned<'a, D> {
    async fn check(&mut self) -> Result<bool> {
        let database = match self.api.show_database(&self.app_id, &self.addon_id).await {
            Ok(database) => database,
            Err(e) if e.is_not_found() => {
                debug!(addon_id = %self.addon_id, "database not visible yet");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        let status = database.status;
        debug!(addon_id = %self.addon_id, ?status, "database status");
        self.last = Some(database);

        match status {
            DatabaseStatus::Running => Ok(true),
            DatabaseStatus::Error => Err(Error::remote_failure(
                format!("database {}", self.addon_id),
                "provisioning reported status error",
            )),
            _ => Ok(false),
        }
    }
}

/// Condition satisfied once a database feature is activated
pub struct DatabaseFeatureActivated<'a, D: DatabaseApi + ?Sized> {
    api: &'a D,
    app_id: String,
    addon_id: String,
    feature: String,
    last: Option<Database>,
}

impl<'a, D: DatabaseApi + ?Sized> DatabaseFeatureActivated<'a, D> {
    pub fn new(
        api: &'a D,
        app_id: impl Into<String>,
        addon_id: impl Into<String>,
        feature: impl Into<String>,
    ) -> Self {
        Self {
            api,
            app_id: app_id.into(),
            addon_id: addon_id.into(),
            feature: feature.into(),
            last: None,
        }
    }

    pub fn into_last(self) -> Option<Database> {
        self.last
    }
}

#[async_trait]
impl<'a, D: DatabaseApi + ?Sized> Condition for DatabaseFeatureActivated<'a, D> {
    async fn check(&mut self) -> Result<bool> {
        let database = self.api.show_database(&self.app_id, &self.addon_id).await?;
        let status = database.feature(&self.feature).map(|f| f.status);
        debug!(addon_id = %self.addon_id, feature = %self.feature, ?status, "database feature status");
        self.last = Some(database);

        match status {
            Some(FeatureStatus::Activated) => Ok(true),
            Some(FeatureStatus::Failed) => Err(Error::remote_failure(
                format!("database feature '{}'", self.feature),
                "activation failed, please contact support",
            )),
            // Not listed yet, pending, or unknown
            _ => Ok(false),
        }
    }
}

/// Block until the database is running and return it
pub async fn wait_for_database<D: DatabaseApi + ?Sized>(
    api: &D,
    cancel: &CancellationToken,
    spec: &WaitSpec,
    app_id: &str,
    addon_id: &str,
) -> Result<Database> {
    let mut checker = DatabaseProvisioned::new(api, app_id, addon_id);
    wait_until(cancel, spec, &mut checker).await?;
    super::observed(checker.into_last(), "database")
}

/// Block until `feature` is activated on the database and return the database
pub async fn wait_for_database_feature<D: DatabaseApi + ?Sized>(
    api: &D,
    cancel: &CancellationToken,
    spec: &WaitSpec,
    app_id: &str,
    addon_id: &str,
    feature: &str,
) -> Result<Database> {
    let mut checker = DatabaseFeatureActivated::new(api, app_id, addon_id, feature);
    wait_until(cancel, spec, &mut checker).await?;
    super::observed(checker.into_last(), "database")
}
