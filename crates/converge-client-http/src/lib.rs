// # Platform HTTP Client
//
// This crate implements the converge-core platform traits over the
// platform's REST API.
//
// ## Behaviour
//
// - Exactly one HTTP request per trait call
// - No retry, no backoff, no caching: callers (the wait engine, the
//   reconciler) decide what an error means
// - HTTP status codes are mapped to `converge_core::Error` variants so that
//   checkers can tell "not visible yet" (404) from hard failures
// - Per-request timeout from `ApiConfig::timeout_secs`
//
// ## Security Requirements
//
// - API token NEVER appears in logs or Debug output
// - Construction fails if the token is empty
//
// ## API Reference
//
// Main API (`ApiConfig::url`):
// - Show addon: GET `/v1/apps/:app/addons/:addon_id` -> `{"addon": {..}}`
// - Restart app: POST `/v1/apps/:app/restart` -> 202, `Location` header
// - Show operation: GET `<Location>` -> `{"operation": {..}}`
// - List variables: GET `/v1/apps/:app/variables` -> `{"variables": [..]}`
// - Unset variable: DELETE `/v1/apps/:app/variables/:variable_id` -> 204
// - Set variables: PUT `/v1/apps/:app/variables` with `{"variables": [..]}`
//
// Database API (`ApiConfig::database_url`):
// - Show database: GET `/api/databases/:addon_id` -> `{"database": {..}}`
// - List firewall rules: GET `/api/databases/:addon_id/firewall_rules`
//   -> `{"rules": [..]}`

use async_trait::async_trait;
use converge_core::config::ApiConfig;
use converge_core::traits::{
    Addon, AddonApi, AppApi, Database, DatabaseApi, EnvironmentApi, FirewallRule, Operation,
    OperationApi, Variable, VariableInput,
};
use converge_core::{Error, Result};
use reqwest::header::LOCATION;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Provider name used in error messages
const PROVIDER: &str = "platform";

/// Default HTTP timeout for API requests (30 seconds)
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client for the platform API
pub struct HttpPlatformClient {
    /// Main API base URL, without trailing slash
    api_url: String,

    /// Database API base URL, without trailing slash
    database_url: String,

    /// API token
    /// ⚠️ NEVER log this value
    token: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for HttpPlatformClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPlatformClient")
            .field("api_url", &self.api_url)
            .field("database_url", &self.database_url)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

impl HttpPlatformClient {
    /// Create a client for the given endpoints
    ///
    /// Fails if the token is empty or the HTTP client cannot be built.
    pub fn new(
        api_url: impl Into<String>,
        database_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(Error::config("platform API token is required"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("converge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_url: trim_base(api_url.into()),
            database_url: trim_base(database_url.into()),
            token,
            client,
        })
    }

    /// Create a client from the API section of the configuration
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        config.validate()?;
        Self::new(
            config.url.clone(),
            config.database_url.clone(),
            config.token.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn app_url(&self, app_id: &str, path: &str) -> String {
        format!("{}/v1/apps/{}{}", self.api_url, app_id, path)
    }

    fn database_api_url(&self, addon_id: &str, path: &str) -> String {
        format!("{}/api/databases/{}{}", self.database_url, addon_id, path)
    }

    /// Send one authenticated request and map non-2xx answers to errors
    async fn send(&self, request: RequestBuilder, context: &str) -> Result<Response> {
        let response = request
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::http(format!("{}: request failed: {}", context, e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        Err(status_error(status, context, &body))
    }

    /// GET `url` and decode the object under `key`
    async fn get_json<T: DeserializeOwned>(&self, url: &str, key: &str, context: &str) -> Result<T> {
        tracing::debug!(url, "GET {}", context);
        let response = self.send(self.client.get(url), context).await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("{}: failed to read response: {}", context, e)))?;
        parse_envelope(&body, key)
    }
}

#[async_trait]
impl AddonApi for HttpPlatformClient {
    async fn show_addon(&self, app_id: &str, addon_id: &str) -> Result<Addon> {
        let url = self.app_url(app_id, &format!("/addons/{}", addon_id));
        self.get_json(&url, "addon", &format!("addon {}", addon_id)).await
    }
}

#[async_trait]
impl DatabaseApi for HttpPlatformClient {
    async fn show_database(&self, _app_id: &str, addon_id: &str) -> Result<Database> {
        let url = self.database_api_url(addon_id, "");
        self.get_json(&url, "database", &format!("database {}", addon_id)).await
    }

    async fn list_firewall_rules(&self, _app_id: &str, addon_id: &str) -> Result<Vec<FirewallRule>> {
        let url = self.database_api_url(addon_id, "/firewall_rules");
        self.get_json(&url, "rules", &format!("firewall rules of {}", addon_id))
            .await
    }
}

#[async_trait]
impl OperationApi for HttpPlatformClient {
    async fn show_operation(&self, location: &str) -> Result<Operation> {
        let url = resolve_location(&self.api_url, location);
        self.get_json(&url, "operation", "operation").await
    }
}

#[async_trait]
impl AppApi for HttpPlatformClient {
    async fn restart_app(&self, app_id: &str) -> Result<Option<String>> {
        let url = self.app_url(app_id, "/restart");
        tracing::info!(app_id, "restarting application");

        let request = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "scope": [] }));
        let response = self.send(request, &format!("restart of {}", app_id)).await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        Ok(location)
    }
}

#[async_trait]
impl EnvironmentApi for HttpPlatformClient {
    async fn list_variables(&self, app_id: &str) -> Result<Vec<Variable>> {
        let url = self.app_url(app_id, "/variables");
        self.get_json(&url, "variables", &format!("variables of {}", app_id))
            .await
    }

    async fn unset_variable(&self, app_id: &str, variable_id: &str) -> Result<()> {
        let url = self.app_url(app_id, &format!("/variables/{}", variable_id));
        tracing::debug!(app_id, variable_id, "DELETE variable");

        self.send(self.client.delete(&url), &format!("variable {}", variable_id))
            .await?;
        Ok(())
    }

    async fn set_variables(&self, app_id: &str, variables: &[VariableInput]) -> Result<Vec<Variable>> {
        let url = self.app_url(app_id, "/variables");
        tracing::debug!(app_id, count = variables.len(), "PUT variables");

        let request = self
            .client
            .put(&url)
            .json(&serde_json::json!({ "variables": variables }));
        let context = format!("variables of {}", app_id);
        let response = self.send(request, &context).await?;
        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("{}: failed to read response: {}", context, e)))?;
        parse_envelope(&body, "variables")
    }
}

/// Map a non-2xx status to the error the core classifies on
fn status_error(status: StatusCode, context: &str, body: &str) -> Error {
    let detail = error_detail(body);
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{}: invalid API token or insufficient permissions. Status: {}",
            context, status
        )),
        404 => Error::not_found(context.to_string()),
        422 => Error::invalid_input(format!("{}: {}", context, detail)),
        429 => Error::rate_limited(format!("{}: status {}", context, status)),
        500..=599 => Error::provider(
            PROVIDER,
            format!("{}: server error (transient): {} - {}", context, status, detail),
        ),
        _ => Error::provider(PROVIDER, format!("{}: {} - {}", context, status, detail)),
    }
}

/// Best-effort extraction of the error text from an error body
///
/// The API answers either `{"error": "..."}` or `{"errors": {field: [..]}}`;
/// anything else is returned as-is.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => {
            if let Some(Value::String(error)) = map.get("error") {
                return error.clone();
            }
            if let Some(errors) = map.get("errors") {
                return errors.to_string();
            }
            body.to_string()
        }
        _ => body.to_string(),
    }
}

/// Decode `{"<key>": <T>}`
fn parse_envelope<T: DeserializeOwned>(body: &str, key: &str) -> Result<T> {
    let mut json: Value = serde_json::from_str(body)?;
    let inner = json
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| {
            Error::provider(
                PROVIDER,
                format!("Invalid response format: missing '{}' field", key),
            )
        })?;
    Ok(serde_json::from_value(inner)?)
}

/// Operation handles are absolute URLs; relative ones hang off the API base
fn resolve_location(api_url: &str, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        location.to_string()
    } else if location.starts_with('/') {
        format!("{}{}", api_url, location)
    } else {
        format!("{}/{}", api_url, location)
    }
}

fn trim_base(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use converge_core::traits::{AddonStatus, OperationStatus};

    fn client() -> HttpPlatformClient {
        HttpPlatformClient::new(
            "https://api.example.test/",
            "https://db-api.example.test",
            "tk-us-secret",
            DEFAULT_HTTP_TIMEOUT,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = HttpPlatformClient::new("https://a", "https://b", "", DEFAULT_HTTP_TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_config_validates() {
        let config = ApiConfig {
            url: "api.example.test".to_string(),
            token: "tk".to_string(),
            ..ApiConfig::default()
        };
        assert!(HttpPlatformClient::from_config(&config).is_err());

        let config = ApiConfig {
            token: "tk".to_string(),
            ..ApiConfig::default()
        };
        assert!(HttpPlatformClient::from_config(&config).is_ok());
    }

    #[test]
    fn test_token_not_exposed_in_debug() {
        let debug_str = format!("{:?}", client());
        assert!(!debug_str.contains("tk-us-secret"));
        assert!(debug_str.contains("HttpPlatformClient"));
    }

    #[test]
    fn test_urls() {
        let client = client();
        assert_eq!(
            client.app_url("my-app", "/variables"),
            "https://api.example.test/v1/apps/my-app/variables"
        );
        assert_eq!(
            client.database_api_url("ad-1", "/firewall_rules"),
            "https://db-api.example.test/api/databases/ad-1/firewall_rules"
        );
    }

    #[test]
    fn test_resolve_location() {
        let base = "https://api.example.test";
        assert_eq!(
            resolve_location(base, "https://other.test/v1/apps/a/operations/op-1"),
            "https://other.test/v1/apps/a/operations/op-1"
        );
        assert_eq!(
            resolve_location(base, "/v1/apps/a/operations/op-1"),
            "https://api.example.test/v1/apps/a/operations/op-1"
        );
        assert_eq!(
            resolve_location(base, "v1/apps/a/operations/op-1"),
            "https://api.example.test/v1/apps/a/operations/op-1"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, "addon ad-1", ""),
            Error::Authentication(_)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "addon ad-1", ""),
            Error::Authentication(_)
        ));
        assert!(status_error(StatusCode::NOT_FOUND, "database ad-1", "").is_not_found());
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "x", ""),
            Error::RateLimited(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, "x", "upstream down"),
            Error::Provider { .. }
        ));
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, "x", r#"{"errors":{"name":["is invalid"]}}"#),
            Error::InvalidInput(_)
        ));
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(error_detail(r#"{"error": "app not found"}"#), "app not found");
        assert_eq!(
            error_detail(r#"{"errors": {"value": ["is too long"]}}"#),
            r#"{"value":["is too long"]}"#
        );
        assert_eq!(error_detail("<html>bad gateway</html>"), "<html>bad gateway</html>");
    }

    #[test]
    fn test_parse_addon_envelope() {
        let body = r#"{"addon": {"id": "ad-1", "app_id": "app-1", "status": "provisioning", "plan": {"name": "starter"}}}"#;
        let addon: Addon = parse_envelope(body, "addon").unwrap();
        assert_eq!(addon.id, "ad-1");
        assert_eq!(addon.status, AddonStatus::Provisioning);
    }

    #[test]
    fn test_parse_operation_envelope() {
        let body = r#"{"operation": {"id": "op-1", "type": "restart", "status": "error", "error": "boot timeout"}}"#;
        let operation: Operation = parse_envelope(body, "operation").unwrap();
        assert_eq!(operation.status, OperationStatus::Error);
        assert_eq!(operation.kind.as_deref(), Some("restart"));
        assert_eq!(operation.error.as_deref(), Some("boot timeout"));
    }

    #[test]
    fn test_parse_variables_envelope() {
        let body = r#"{"variables": [{"id": "v1", "name": "A", "value": "1"}, {"id": "v2", "name": "B", "value": ""}]}"#;
        let variables: Vec<Variable> = parse_envelope(body, "variables").unwrap();
        assert_eq!(variables.len(), 2);
        assert_eq!(variables[1].value, "");
    }

    #[test]
    fn test_parse_rules_envelope() {
        let body = r#"{"rules": [{"id": "fw-1", "type": "custom_range", "cidr": "10.0.0.0/8", "label": "office"}]}"#;
        let rules: Vec<FirewallRule> = parse_envelope(body, "rules").unwrap();
        assert_eq!(rules[0].rule_type, "custom_range");
    }

    #[test]
    fn test_missing_envelope_key() {
        let err = parse_envelope::<Addon>(r#"{"app": {}}"#, "addon").unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));

        let err = parse_envelope::<Addon>("not json", "addon").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
