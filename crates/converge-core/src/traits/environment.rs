// # Environment API Trait
//
// The environment of an application is a set of named string variables.
// Each remote variable has an ID, which is what deletion addresses, while
// setting is a batched upsert by name.
//
// ## Usage
//
// ```rust,ignore
// use converge_core::traits::{EnvironmentApi, VariableInput};
//
// client.set_variables("my-app", &[VariableInput::new("PORT", "8080")]).await?;
// for variable in client.list_variables("my-app").await? {
//     println!("{}={}", variable.name, variable.value);
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Environment;

/// A variable as stored on the remote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    /// Remote variable ID
    pub id: String,
    /// Variable name
    pub name: String,
    /// Variable value
    pub value: String,
}

/// A name/value pair to upsert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableInput {
    pub name: String,
    pub value: String,
}

impl VariableInput {
    /// Create a new variable input
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Collapse a remote variable listing into a name -> value map
pub fn to_environment(variables: Vec<Variable>) -> Environment {
    variables.into_iter().map(|v| (v.name, v.value)).collect()
}

/// Trait for reading and writing an application's environment
///
/// # Idempotency
///
/// `set_variables` is an upsert: setting a variable that already exists
/// replaces its value, so additions and modifications share one call.
#[async_trait]
pub trait EnvironmentApi: Send + Sync {
    /// List every variable of the application
    async fn list_variables(&self, app_id: &str) -> Result<Vec<Variable>, crate::Error>;

    /// Delete one variable by its remote ID
    async fn unset_variable(&self, app_id: &str, variable_id: &str) -> Result<(), crate::Error>;

    /// Upsert a batch of variables in a single call
    async fn set_variables(
        &self,
        app_id: &str,
        variables: &[VariableInput],
    ) -> Result<Vec<Variable>, crate::Error>;
}
