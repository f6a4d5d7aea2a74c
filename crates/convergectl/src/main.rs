// # convergectl - Environment Convergence Tool
//
// Thin command-line layer over converge-core:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Building the HTTP platform client
// 4. Converging one application's environment, then optionally restarting
//    it and waiting for the restart operation
//
// All reconciliation and waiting logic lives in converge-core.
//
// ## Configuration
//
// ### API
// - `CONVERGE_API_URL`: Platform API base URL (optional)
// - `CONVERGE_DATABASE_API_URL`: Database API base URL (optional)
// - `CONVERGE_API_TOKEN`: API token (required)
// - `CONVERGE_CONFIG_FILE`: JSON file with `api` and `pollers` sections
//   (optional; the variables above override its `api` section)
//
// ### Application
// - `CONVERGE_APP_ID`: Application to converge (required)
// - `CONVERGE_DESIRED_ENV_FILE`: JSON object of variable name -> value
//   (required)
// - `CONVERGE_STATE_FILE`: Where the last applied environment is kept
//   (optional). Variables removed from the desired file since the last run
//   are unset remotely. Without a state file, variables are only added or
//   updated, never unset.
// - `CONVERGE_RESTART`: Restart the app after changing its environment
//   (`true`/`false`, default `false`)
//
// ### Logging
// - `CONVERGE_LOG_LEVEL`: trace, debug, info, warn, error (default `info`)
//
// ## Example
//
// ```bash
// export CONVERGE_API_TOKEN=tk-us-...
// export CONVERGE_APP_ID=my-app
// export CONVERGE_DESIRED_ENV_FILE=./env.json
// export CONVERGE_STATE_FILE=/var/lib/converge/my-app.json
// export CONVERGE_RESTART=true
//
// convergectl
// ```

use anyhow::{Context, Result};
use converge_client_http::HttpPlatformClient;
use converge_core::traits::{AppApi, Operation, OperationApi};
use converge_core::{
    CancellationToken, ConvergeConfig, Environment, Reconciler, WaitSpec, wait_for_operation,
};
use std::env;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// - 0: Environment converged (and restart finished, if requested)
/// - 1: Configuration or startup error
/// - 2: Remote or runtime error
/// - 3: Interrupted by a signal
#[derive(Debug, Clone, Copy)]
enum ConvergeExitCode {
    Converged = 0,
    ConfigError = 1,
    RuntimeError = 2,
    Interrupted = 3,
}

impl From<ConvergeExitCode> for ExitCode {
    fn from(code: ConvergeExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Command configuration
struct Config {
    converge: ConvergeConfig,
    app_id: String,
    desired_env_file: PathBuf,
    state_file: Option<PathBuf>,
    restart: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let mut converge = match env::var("CONVERGE_CONFIG_FILE") {
            Ok(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read CONVERGE_CONFIG_FILE {}", path))?;
                ConvergeConfig::from_json(&text)
                    .with_context(|| format!("invalid configuration in {}", path))?
            }
            Err(_) => ConvergeConfig::default(),
        };

        if let Ok(url) = env::var("CONVERGE_API_URL") {
            converge.api.url = url;
        }
        if let Ok(url) = env::var("CONVERGE_DATABASE_API_URL") {
            converge.api.database_url = url;
        }
        if let Ok(token) = env::var("CONVERGE_API_TOKEN") {
            converge.api.token = token;
        }

        Ok(Self {
            converge,
            app_id: env::var("CONVERGE_APP_ID").unwrap_or_default(),
            desired_env_file: env::var("CONVERGE_DESIRED_ENV_FILE")
                .map(PathBuf::from)
                .unwrap_or_default(),
            state_file: env::var("CONVERGE_STATE_FILE").ok().map(PathBuf::from),
            restart: parse_bool(
                "CONVERGE_RESTART",
                &env::var("CONVERGE_RESTART").unwrap_or_default(),
            )?,
            log_level: env::var("CONVERGE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.converge.api.token.is_empty() {
            anyhow::bail!(
                "CONVERGE_API_TOKEN is required. \
                Set it via: export CONVERGE_API_TOKEN=your_token"
            );
        }

        self.converge
            .validate()
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        if self.app_id.is_empty() {
            anyhow::bail!("CONVERGE_APP_ID is required");
        }

        if self.desired_env_file.as_os_str().is_empty() {
            anyhow::bail!(
                "CONVERGE_DESIRED_ENV_FILE is required. \
                It must contain a JSON object of variable names to values"
            );
        }

        if let Some(parent) = self.state_file.as_ref().and_then(|p| p.parent())
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "CONVERGE_STATE_FILE parent directory does not exist: {}",
                parent.display()
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "CONVERGE_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "" | "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        other => anyhow::bail!("{} must be true or false, got '{}'", name, other),
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ConvergeExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return ConvergeExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ConvergeExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ConvergeExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let cancel = CancellationToken::new();
        tokio::spawn(cancel_on_signal(cancel.clone()));

        until_cancelled(&cancel, run(config, &cancel)).await
    })
    .into()
}

/// Drive `work` to completion unless `cancel` fires first
async fn until_cancelled<F>(cancel: &CancellationToken, work: F) -> ConvergeExitCode
where
    F: Future<Output = Result<()>>,
{
    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(anyhow::Error::new(converge_core::Error::Cancelled)),
        result = work => result,
    };

    match result {
        Ok(()) => ConvergeExitCode::Converged,
        Err(e) if is_cancelled(&e) => {
            warn!("Interrupted: {:#}", e);
            ConvergeExitCode::Interrupted
        }
        Err(e) => {
            error!("{:#}", e);
            ConvergeExitCode::RuntimeError
        }
    }
}

/// Converge the application's environment and optionally restart it
async fn run(config: Config, cancel: &CancellationToken) -> Result<()> {
    let client = HttpPlatformClient::from_config(&config.converge.api)?;
    let reconciler = Reconciler::new(&client);
    let app_id = config.app_id.as_str();

    let desired = read_environment(&config.desired_env_file)
        .await?
        .context("CONVERGE_DESIRED_ENV_FILE does not exist")?;

    let current = match &config.state_file {
        Some(path) => read_environment(path).await?,
        None => None,
    };
    let current = match current {
        Some(previous) => previous,
        None => {
            // Nothing recorded: only compare the variables we manage
            info!(app_id, "no previous state, variables will not be unset");
            let mut remote = reconciler.current(app_id).await?;
            remote.retain(|name, _| desired.contains_key(name));
            remote
        }
    };

    info!(app_id, variables = desired.len(), "converging environment");
    let converged = reconciler.converge(app_id, &current, &desired).await?;
    let changes = &converged.changes;

    if changes.is_empty() {
        info!(app_id, "environment already up to date");
    } else {
        info!(
            app_id,
            added = ?changes.added,
            modified = ?changes.modified,
            deleted = ?changes.deleted,
            "environment updated"
        );
    }

    if let Some(path) = &config.state_file {
        let json = serde_json::to_string_pretty(&desired)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("failed to write state file {}", path.display()))?;
    }

    if config.restart && !changes.is_empty() {
        let spec = config.converge.pollers.operation.to_spec();
        if let Some(operation) = restart(&client, cancel, &spec, app_id).await? {
            info!(app_id, operation_id = %operation.id, "restart finished");
        }
    }

    Ok(())
}

/// Restart the application and wait for the restart operation
///
/// A rejected restart request is logged and ignored: the new environment
/// is applied at the application's next start. Failures of the restart
/// operation itself are returned.
async fn restart<C>(
    api: &C,
    cancel: &CancellationToken,
    spec: &WaitSpec,
    app_id: &str,
) -> converge_core::Result<Option<Operation>>
where
    C: AppApi + OperationApi + ?Sized,
{
    if cancel.is_cancelled() {
        return Err(converge_core::Error::Cancelled);
    }

    let location = match api.restart_app(app_id).await {
        Ok(Some(location)) => location,
        Ok(None) => {
            info!(app_id, "restart requested, no operation to follow");
            return Ok(None);
        }
        Err(e) => {
            warn!(app_id, "restart not performed, environment applies on next start: {}", e);
            return Ok(None);
        }
    };

    info!(app_id, %location, "waiting for restart operation");
    wait_for_operation(api, cancel, spec, &location).await.map(Some)
}

/// Read a JSON environment file; `None` if it does not exist
async fn read_environment(path: &std::path::Path) -> Result<Option<Environment>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let environment = serde_json::from_str(&text)
                .with_context(|| format!("{} must be a JSON object of strings", path.display()))?;
            Ok(Some(environment))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

fn is_cancelled(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<converge_core::Error>()
        .is_some_and(converge_core::Error::is_cancelled)
}

/// Cancel `cancel` on SIGTERM or SIGINT
#[cfg(unix)]
async fn cancel_on_signal(cancel: CancellationToken) {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
        (Err(e), _) | (_, Err(e)) => {
            warn!("Failed to install signal handlers: {}", e);
            return;
        }
    };

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!("Received {}, cancelling", name);
    cancel.cancel();
}

/// Cancel `cancel` on CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn cancel_on_signal(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received CTRL-C, cancelling");
            cancel.cancel();
        }
        Err(e) => warn!("Failed to wait for CTRL-C: {}", e),
    }
}
