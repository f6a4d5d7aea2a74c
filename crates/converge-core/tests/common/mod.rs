//! Test doubles and common utilities for contract tests
//!
//! The scripted platform answers each remote call from a per-entity script
//! and records every call it receives, so tests can assert on call counts
//! and ordering.

#![allow(dead_code)]

use async_trait::async_trait;
use converge_core::error::{Error, Result};
use converge_core::traits::{
    Addon, AddonApi, AddonStatus, AppApi, Database, DatabaseApi, DatabaseFeature,
    DatabaseStatus, EnvironmentApi, FeatureStatus, FirewallRule, Operation, OperationApi,
    OperationStatus, Variable, VariableInput,
};
use converge_core::{Environment, MemoryEnvironment};
use std::collections::VecDeque;
use std::sync::Mutex;

/// One remote call, as seen by the scripted platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ShowAddon(String),
    ShowDatabase(String),
    ListFirewallRules(String),
    ShowOperation(String),
    RestartApp(String),
    ListVariables,
    UnsetVariable(String),
    SetVariables(Vec<String>),
}

/// A scripted answer
#[derive(Debug, Clone)]
pub enum Reply<T> {
    Ok(T),
    NotFound,
    Unauthorized,
}

impl<T: Clone> Reply<T> {
    fn into_result(self, what: &str) -> Result<T> {
        match self {
            Reply::Ok(value) => Ok(value),
            Reply::NotFound => Err(Error::not_found(what.to_string())),
            Reply::Unauthorized => Err(Error::auth("invalid token")),
        }
    }
}

/// Answers in order; the last answer repeats forever
pub struct Script<T> {
    replies: Mutex<VecDeque<Reply<T>>>,
}

impl<T: Clone> Script<T> {
    pub fn new(replies: Vec<Reply<T>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    fn next(&self, what: &str) -> Result<T> {
        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        reply
            .unwrap_or(Reply::NotFound)
            .into_result(what)
    }
}

/// A platform double driven by scripts
pub struct ScriptedPlatform {
    pub addon: Script<AddonStatus>,
    pub database: Script<Database>,
    pub firewall_rules: Script<Vec<FirewallRule>>,
    pub operation: Script<Operation>,
    pub restart_location: Option<String>,
    pub environment: MemoryEnvironment,
    /// Variable name whose unset call fails
    pub fail_unset_of: Option<String>,
    /// Make the batched set call fail
    pub fail_set: bool,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedPlatform {
    pub fn new() -> Self {
        Self {
            addon: Script::empty(),
            database: Script::empty(),
            firewall_rules: Script::empty(),
            operation: Script::empty(),
            restart_location: None,
            environment: MemoryEnvironment::new(),
            fail_unset_of: None,
            fail_set: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_addon(mut self, replies: Vec<Reply<AddonStatus>>) -> Self {
        self.addon = Script::new(replies);
        self
    }

    pub fn with_database(mut self, replies: Vec<Reply<Database>>) -> Self {
        self.database = Script::new(replies);
        self
    }

    pub fn with_firewall_rules(mut self, replies: Vec<Reply<Vec<FirewallRule>>>) -> Self {
        self.firewall_rules = Script::new(replies);
        self
    }

    pub fn with_operation(mut self, replies: Vec<Reply<Operation>>) -> Self {
        self.operation = Script::new(replies);
        self
    }

    pub fn with_restart_location(mut self, location: &str) -> Self {
        self.restart_location = Some(location.to_string());
        self
    }

    pub async fn with_environment(self, app_id: &str, environment: &Environment) -> Self {
        self.environment.seed(app_id, environment).await;
        self
    }

    /// Every call received so far
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of calls matching `predicate`
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AddonApi for ScriptedPlatform {
    async fn show_addon(&self, app_id: &str, addon_id: &str) -> Result<Addon> {
        self.record(Call::ShowAddon(addon_id.to_string()));
        let status = self.addon.next("addon")?;
        Ok(Addon {
            id: addon_id.to_string(),
            app_id: app_id.to_string(),
            status,
            provider_id: Some("postgresql".to_string()),
        })
    }
}

#[async_trait]
impl DatabaseApi for ScriptedPlatform {
    async fn show_database(&self, _app_id: &str, addon_id: &str) -> Result<Database> {
        self.record(Call::ShowDatabase(addon_id.to_string()));
        self.database.next("database")
    }

    async fn list_firewall_rules(&self, _app_id: &str, addon_id: &str) -> Result<Vec<FirewallRule>> {
        self.record(Call::ListFirewallRules(addon_id.to_string()));
        self.firewall_rules.next("firewall rules")
    }
}

#[async_trait]
impl OperationApi for ScriptedPlatform {
    async fn show_operation(&self, location: &str) -> Result<Operation> {
        self.record(Call::ShowOperation(location.to_string()));
        self.operation.next("operation")
    }
}

#[async_trait]
impl AppApi for ScriptedPlatform {
    async fn restart_app(&self, app_id: &str) -> Result<Option<String>> {
        self.record(Call::RestartApp(app_id.to_string()));
        Ok(self.restart_location.clone())
    }
}

#[async_trait]
impl EnvironmentApi for ScriptedPlatform {
    async fn list_variables(&self, app_id: &str) -> Result<Vec<Variable>> {
        self.record(Call::ListVariables);
        self.environment.list_variables(app_id).await
    }

    async fn unset_variable(&self, app_id: &str, variable_id: &str) -> Result<()> {
        let name = self
            .environment
            .list_variables(app_id)
            .await?
            .into_iter()
            .find(|v| v.id == variable_id)
            .map(|v| v.name)
            .unwrap_or_default();
        self.record(Call::UnsetVariable(name.clone()));

        if self.fail_unset_of.as_deref() == Some(name.as_str()) {
            return Err(Error::http("502 Bad Gateway"));
        }
        self.environment.unset_variable(app_id, variable_id).await
    }

    async fn set_variables(&self, app_id: &str, variables: &[VariableInput]) -> Result<Vec<Variable>> {
        self.record(Call::SetVariables(
            variables.iter().map(|v| v.name.clone()).collect(),
        ));

        if self.fail_set {
            return Err(Error::http("500 Internal Server Error"));
        }
        self.environment.set_variables(app_id, variables).await
    }
}

/// Build an environment from pairs
pub fn env(pairs: &[(&str, &str)]) -> Environment {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A database in the given state
pub fn database(status: DatabaseStatus, features: &[(&str, FeatureStatus)]) -> Database {
    Database {
        id: "ad-db".to_string(),
        app_id: "app".to_string(),
        status,
        features: features
            .iter()
            .map(|(name, status)| DatabaseFeature {
                name: name.to_string(),
                status: *status,
            })
            .collect(),
    }
}

/// An operation in the given state
pub fn operation(status: OperationStatus, error: Option<&str>) -> Operation {
    Operation {
        id: "op-1".to_string(),
        kind: Some("restart".to_string()),
        status,
        error: error.map(str::to_string),
    }
}

/// A custom range firewall rule
pub fn rule(id: &str) -> FirewallRule {
    FirewallRule {
        id: id.to_string(),
        rule_type: "custom_range".to_string(),
        cidr: Some("10.0.0.0/8".to_string()),
        label: Some("office".to_string()),
    }
}
