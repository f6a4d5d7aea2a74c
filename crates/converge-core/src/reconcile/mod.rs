//! Environment reconciler
//!
//! Applies a [`KeyValueDiff`] to an application's remote environment:
//!
//! 1. every deleted name is unset, one call per variable, looked up by name
//!    in a single listing;
//! 2. `added ∪ modified` is sent as one batched upsert;
//! 3. the full environment is listed again and returned as the new source
//!    of truth, since the remote may normalise values.
//!
//! Deletions always go first so that a key removed and re-added under
//! another spelling within the same change cannot collide. The first failing
//! call aborts the reconciliation; changes already applied are not rolled
//! back and the next read will show the partial state.

use std::collections::BTreeSet;

use tracing::debug;

use crate::Environment;
use crate::diff::{KeyValueDiff, diff};
use crate::error::{Error, Result};
use crate::traits::{EnvironmentApi, VariableInput, to_environment};

/// Result of [`Reconciler::converge`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converged {
    /// The changes that were applied
    pub changes: KeyValueDiff<String>,
    /// The remote environment after applying them
    pub environment: Environment,
}

/// Applies environment diffs against the remote platform
pub struct Reconciler<'a, E: EnvironmentApi + ?Sized> {
    api: &'a E,
}

impl<'a, E: EnvironmentApi + ?Sized> Reconciler<'a, E> {
    pub fn new(api: &'a E) -> Self {
        Self { api }
    }

    /// Read the application's full remote environment
    pub async fn current(&self, app_id: &str) -> Result<Environment> {
        Ok(to_environment(self.api.list_variables(app_id).await?))
    }

    /// Apply `changes` and return the environment read back afterwards
    ///
    /// Values for added and modified keys are taken from `desired`; a key in
    /// the diff without a desired value is rejected before any remote call.
    pub async fn reconcile(
        &self,
        app_id: &str,
        changes: &KeyValueDiff<String>,
        desired: &Environment,
    ) -> Result<Environment> {
        let batch = changes
            .upserts()
            .map(|name| {
                desired
                    .get(name)
                    .map(|value| VariableInput::new(name.as_str(), value.as_str()))
                    .ok_or_else(|| {
                        Error::invalid_input(format!("no desired value for variable {name}"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        self.unset_by_name(app_id, &changes.deleted).await?;

        if !batch.is_empty() {
            debug!(app_id, count = batch.len(), "setting variables");
            self.api.set_variables(app_id, &batch).await?;
        }

        self.current(app_id).await
    }

    /// Diff `current` against `desired` and reconcile the result
    ///
    /// `current` is the caller's last known state, typically what was
    /// recorded after the previous run.
    pub async fn converge(
        &self,
        app_id: &str,
        current: &Environment,
        desired: &Environment,
    ) -> Result<Converged> {
        let changes = diff(current, desired);
        debug!(
            app_id,
            added = changes.added.len(),
            deleted = changes.deleted.len(),
            modified = changes.modified.len(),
            "computed environment diff"
        );

        let environment = self.reconcile(app_id, &changes, desired).await?;
        Ok(Converged {
            changes,
            environment,
        })
    }

    /// Unset every remote variable whose name is in `names`
    ///
    /// Names with no remote variable are skipped.
    async fn unset_by_name(&self, app_id: &str, names: &BTreeSet<String>) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }

        let variables = self.api.list_variables(app_id).await?;
        for variable in variables.iter().filter(|v| names.contains(&v.name)) {
            debug!(app_id, name = %variable.name, "unsetting variable");
            self.api.unset_variable(app_id, &variable.id).await?;
        }

        Ok(())
    }
}
