// # Firewall Rule Visibility Checker
//
// A freshly created firewall rule can take a while to show up in the rule
// listing. This checker lists the rules of a database and searches them for
// the target ID; absence is "not yet", never an error.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Result;
use crate::traits::{DatabaseApi, FirewallRule};
use crate::wait::{Condition, WaitSpec, wait_until};

/// Condition satisfied once the rule appears in the listing
pub struct FirewallRuleVisible<'a, D: DatabaseApi + ?Sized> {
    api: &'a D,
    app_id: String,
    addon_id: String,
    rule_id: String,
    found: Option<FirewallRule>,
}

impl<'a, D: DatabaseApi + ?Sized> FirewallRuleVisible<'a, D> {
    pub fn new(
        api: &'a D,
        app_id: impl Into<String>,
        addon_id: impl Into<String>,
        rule_id: impl Into<String>,
    ) -> Self {
        Self {
            api,
            app_id: app_id.into(),
            addon_id: addon_id.into(),
            rule_id: rule_id.into(),
            found: None,
        }
    }

    pub fn into_found(self) -> Option<FirewallRule> {
        self.found
    }
}

#[async_trait]
impl<'a, D: DatabaseApi + ?Sized> Condition for FirewallRuleVisible<'a, D> {
    async fn check(&mut self) -> Result<bool> {
        let rules = self.api.list_firewall_rules(&self.app_id, &self.addon_id).await?;
        debug!(rule_id = %self.rule_id, listed = rules.len(), "searching firewall rules");

        self.found = rules.into_iter().find(|rule| rule.id == self.rule_id);
        Ok(self.found.is_some())
    }
}

/// Block until the rule is visible and return it
///
/// When `spec` has no timeout message, the timeout error names the rule.
pub async fn wait_for_firewall_rule<D: DatabaseApi + ?Sized>(
    api: &D,
    cancel: &CancellationToken,
    spec: &WaitSpec,
    app_id: &str,
    addon_id: &str,
    rule_id: &str,
) -> Result<FirewallRule> {
    let named;
    let spec = if spec.timeout_message().is_some() {
        spec
    } else {
        named = spec
            .clone()
            .with_timeout_message(format!("firewall rule {rule_id} not visible before timeout"));
        &named
    };

    let mut checker = FirewallRuleVisible::new(api, app_id, addon_id, rule_id);
    wait_until(cancel, spec, &mut checker).await?;
    super::observed(checker.into_found(), "firewall rule")
}
