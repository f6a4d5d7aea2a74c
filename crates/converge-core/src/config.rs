//! Configuration types for the converge system
//!
//! Poll cadences and deadlines for every checker, plus the connection
//! settings of the remote platform API. All of it deserializes from JSON
//! with defaults for anything left out.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::wait::WaitSpec;

/// Main converge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvergeConfig {
    /// Remote platform API settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Per-checker poll settings
    #[serde(default)]
    pub pollers: PollersConfig,
}

impl ConvergeConfig {
    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self, crate::Error> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.api.validate()?;
        self.pollers.validate()
    }
}

/// Remote platform API configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the platform API
    #[serde(default = "default_api_url")]
    pub url: String,

    /// Base URL of the database API (databases, firewall rules)
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// API token
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub token: String,

    /// Per-request HTTP timeout (in seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("url", &self.url)
            .field("database_url", &self.database_url)
            .field("token", &"<REDACTED>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ApiConfig {
    /// Validate the API configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        for url in [&self.url, &self.database_url] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(crate::Error::config(format!(
                    "API URL must use HTTP or HTTPS scheme, got: {}",
                    url
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("API timeout must be > 0"));
        }
        Ok(())
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            database_url: default_database_url(),
            token: String::new(),
            timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Poll settings for one kind of wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitSettings {
    /// Delay between checks (in seconds)
    pub interval_secs: u64,

    /// Give up after this long (in seconds); 0 polls until cancelled
    #[serde(default)]
    pub timeout_secs: u64,

    /// Check once before the first interval elapses
    #[serde(default)]
    pub immediate: bool,

    /// Message of the timeout error
    #[serde(default)]
    pub timeout_message: Option<String>,
}

impl WaitSettings {
    /// Create settings without a custom timeout message
    pub fn new(interval_secs: u64, timeout_secs: u64) -> Self {
        Self {
            interval_secs,
            timeout_secs,
            immediate: false,
            timeout_message: None,
        }
    }

    /// Check once before the first interval elapses
    pub fn with_immediate(mut self, immediate: bool) -> Self {
        self.immediate = immediate;
        self
    }

    /// Set the timeout message
    pub fn with_timeout_message(mut self, message: impl Into<String>) -> Self {
        self.timeout_message = Some(message.into());
        self
    }

    /// Build the wait spec described by these settings
    pub fn to_spec(&self) -> WaitSpec {
        let spec = WaitSpec::new(Duration::from_secs(self.interval_secs))
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_immediate(self.immediate);

        match &self.timeout_message {
            Some(message) => spec.with_timeout_message(message.clone()),
            None => spec,
        }
    }

    /// Validate the settings
    pub fn validate(&self, name: &str) -> Result<(), crate::Error> {
        if self.interval_secs == 0 {
            return Err(crate::Error::config(format!(
                "{name} poll interval must be > 0"
            )));
        }
        Ok(())
    }
}

/// Poll settings for every checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollersConfig {
    /// Addon provisioning
    #[serde(default = "default_addon_wait")]
    pub addon: WaitSettings,

    /// Database provisioning
    #[serde(default = "default_database_wait")]
    pub database: WaitSettings,

    /// Database feature activation
    #[serde(default = "default_database_feature_wait")]
    pub database_feature: WaitSettings,

    /// Long-running operations (restarts)
    #[serde(default = "default_operation_wait")]
    pub operation: WaitSettings,

    /// Firewall rule visibility after creation
    #[serde(default = "default_firewall_rule_wait")]
    pub firewall_rule: WaitSettings,
}

impl PollersConfig {
    /// Validate every poller's settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.addon.validate("addon")?;
        self.database.validate("database")?;
        self.database_feature.validate("database_feature")?;
        self.operation.validate("operation")?;
        self.firewall_rule.validate("firewall_rule")?;
        Ok(())
    }
}

impl Default for PollersConfig {
    fn default() -> Self {
        Self {
            addon: default_addon_wait(),
            database: default_database_wait(),
            database_feature: default_database_feature_wait(),
            operation: default_operation_wait(),
            firewall_rule: default_firewall_rule_wait(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.osc-fr1.scalingo.com".to_string()
}

fn default_database_url() -> String {
    "https://db-api.osc-fr1.scalingo.com".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_addon_wait() -> WaitSettings {
    WaitSettings::new(5, 5 * 60)
        .with_immediate(true)
        .with_timeout_message("addon provisioning timed out")
}

fn default_database_wait() -> WaitSettings {
    WaitSettings::new(5, 20 * 60)
        .with_immediate(true)
        .with_timeout_message("database provisioning timed out")
}

fn default_database_feature_wait() -> WaitSettings {
    WaitSettings::new(3, 10 * 60).with_timeout_message("database feature activation timed out")
}

fn default_operation_wait() -> WaitSettings {
    WaitSettings::new(5, 5 * 60).with_timeout_message("restart operation timeout")
}

// No message: the firewall waiter names the rule in its own
fn default_firewall_rule_wait() -> WaitSettings {
    WaitSettings::new(5, 120)
}
