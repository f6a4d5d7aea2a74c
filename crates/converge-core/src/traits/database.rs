// # Database API Trait
//
// Read access to managed databases: their provisioning status, the status of
// optional features, and the firewall rules guarding them.
//
// Databases are not always visible right after their creation call returns,
// so `show_database` may report `Error::NotFound` for a while. Pollers that
// run right after creation treat that as "not yet", not as a failure.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Lifecycle status reported for a database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseStatus {
    Creating,
    Updating,
    Running,
    Migrating,
    Upgrading,
    Stopped,
    Error,
    #[serde(other)]
    Unknown,
}

/// Activation status of a database feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FeatureStatus {
    Pending,
    Activated,
    Failed,
    #[serde(other)]
    Unknown,
}

/// An optional database feature (e.g. "force-ssl", "publicly-available")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseFeature {
    pub name: String,
    pub status: FeatureStatus,
}

/// A managed database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Database {
    /// Database (addon) ID
    pub id: String,
    /// Application owning the database
    pub app_id: String,
    /// Current lifecycle status
    pub status: DatabaseStatus,
    /// Optional features and their activation status
    #[serde(default)]
    pub features: Vec<DatabaseFeature>,
}

impl Database {
    /// Look up a feature by name
    pub fn feature(&self, name: &str) -> Option<&DatabaseFeature> {
        self.features.iter().find(|f| f.name == name)
    }
}

/// A firewall rule allowing traffic to a database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallRule {
    /// Rule ID
    pub id: String,
    /// Rule type ("custom_range" or "managed_range")
    #[serde(rename = "type")]
    pub rule_type: String,
    /// Allowed CIDR
    #[serde(default)]
    pub cidr: Option<String>,
    /// Human readable label
    #[serde(default)]
    pub label: Option<String>,
}

/// Trait for reading database state
#[async_trait]
pub trait DatabaseApi: Send + Sync {
    /// Fetch the database backing addon `addon_id` of application `app_id`
    async fn show_database(&self, app_id: &str, addon_id: &str) -> Result<Database, crate::Error>;

    /// List the firewall rules of a database
    async fn list_firewall_rules(
        &self,
        app_id: &str,
        addon_id: &str,
    ) -> Result<Vec<FirewallRule>, crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_lookup() {
        let db: Database = serde_json::from_value(serde_json::json!({
            "id": "ad-1",
            "app_id": "app-1",
            "status": "running",
            "features": [
                { "name": "force-ssl", "status": "ACTIVATED" },
                { "name": "publicly-available", "status": "PENDING" },
            ],
        }))
        .unwrap();

        assert_eq!(db.status, DatabaseStatus::Running);
        assert_eq!(
            db.feature("publicly-available").map(|f| f.status),
            Some(FeatureStatus::Pending)
        );
        assert!(db.feature("missing").is_none());
    }
}
