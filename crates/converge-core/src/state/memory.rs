// # Memory Environment
//
// In-memory implementation of EnvironmentApi.
//
// ## Purpose
//
// Stands in for the remote platform when reconciling against a local copy:
// tests, dry runs, and embedding the reconciler where no platform exists.
// Variables are kept per application in insertion order and get
// sequential IDs (`var-1`, `var-2`, ...), like a remote would assign.
//
// Setting a variable that already exists keeps its ID and replaces its
// value, matching the remote upsert semantics.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Environment;
use crate::Error;
use crate::traits::environment::{EnvironmentApi, Variable, VariableInput, to_environment};

/// In-memory environment store
///
/// # Example
///
/// ```rust,no_run
/// use converge_core::state::MemoryEnvironment;
/// use converge_core::traits::{EnvironmentApi, VariableInput};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryEnvironment::new();
///
///     store.set_variables("my-app", &[VariableInput::new("PORT", "8080")]).await?;
///
///     let variables = store.list_variables("my-app").await?;
///     assert_eq!(variables[0].value, "8080");
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryEnvironment {
    inner: Arc<RwLock<HashMap<String, Vec<Variable>>>>,
    next_id: Arc<AtomicU64>,
}

impl MemoryEnvironment {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the environment of `app_id` with `environment`
    pub async fn seed(&self, app_id: &str, environment: &Environment) {
        let variables = environment
            .iter()
            .map(|(name, value)| Variable {
                id: self.allocate_id(),
                name: name.clone(),
                value: value.clone(),
            })
            .collect();

        self.inner.write().await.insert(app_id.to_string(), variables);
    }

    /// Current environment of `app_id` as a map
    pub async fn snapshot(&self, app_id: &str) -> Environment {
        let guard = self.inner.read().await;
        to_environment(guard.get(app_id).cloned().unwrap_or_default())
    }

    fn allocate_id(&self) -> String {
        format!("var-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl EnvironmentApi for MemoryEnvironment {
    async fn list_variables(&self, app_id: &str) -> Result<Vec<Variable>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(app_id).cloned().unwrap_or_default())
    }

    async fn unset_variable(&self, app_id: &str, variable_id: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let variables = guard
            .get_mut(app_id)
            .ok_or_else(|| Error::not_found(format!("app {app_id}")))?;

        let position = variables
            .iter()
            .position(|v| v.id == variable_id)
            .ok_or_else(|| Error::not_found(format!("variable {variable_id}")))?;
        variables.remove(position);
        Ok(())
    }

    async fn set_variables(
        &self,
        app_id: &str,
        inputs: &[VariableInput],
    ) -> Result<Vec<Variable>, Error> {
        let mut guard = self.inner.write().await;
        let variables = guard.entry(app_id.to_string()).or_default();

        let mut written = Vec::with_capacity(inputs.len());
        for input in inputs {
            match variables.iter_mut().find(|v| v.name == input.name) {
                Some(existing) => {
                    existing.value = input.value.clone();
                    written.push(existing.clone());
                }
                None => {
                    let variable = Variable {
                        id: self.allocate_id(),
                        name: input.name.clone(),
                        value: input.value.clone(),
                    };
                    variables.push(variable.clone());
                    written.push(variable);
                }
            }
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_is_upsert() {
        let store = MemoryEnvironment::new();

        let first = store
            .set_variables("app", &[VariableInput::new("A", "1")])
            .await
            .unwrap();
        let second = store
            .set_variables("app", &[VariableInput::new("A", "2"), VariableInput::new("B", "3")])
            .await
            .unwrap();

        assert_eq!(first[0].id, second[0].id);
        assert_eq!(second[0].value, "2");
        assert_ne!(second[0].id, second[1].id);
        assert_eq!(store.list_variables("app").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unset_by_id() {
        let store = MemoryEnvironment::new();
        let written = store
            .set_variables("app", &[VariableInput::new("A", "1"), VariableInput::new("B", "2")])
            .await
            .unwrap();

        store.unset_variable("app", &written[0].id).await.unwrap();

        let remaining = store.snapshot("app").await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining.get("B").map(String::as_str), Some("2"));
    }

    #[tokio::test]
    async fn test_unset_unknown_is_not_found() {
        let store = MemoryEnvironment::new();
        store.seed("app", &Environment::new()).await;

        let err = store.unset_variable("app", "var-42").await.unwrap_err();
        assert!(err.is_not_found());

        let err = store.unset_variable("other", "var-1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_app_is_empty() {
        let store = MemoryEnvironment::new();
        assert!(store.list_variables("nope").await.unwrap().is_empty());
        assert!(store.snapshot("nope").await.is_empty());
    }
}
