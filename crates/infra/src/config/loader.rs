//! Configuration loader
//!
//! Loads the pipeline configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If none of the required variables is set, falls back to loading from
//!    file; a partial or invalid environment is reported as-is
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `DM_AUTH_URL`, `DM_GRAPH_URL`, `DM_REST_URL`: endpoint URLs (required)
//! - `DM_CLIENT_API`, `DM_CLIENT_SECRET`: client credential (required)
//! - `DM_GRANT_TYPE`: `client_credentials` (default) or `password`
//! - `DM_SCOPES`: scopes separated by commas or whitespace
//! - `DM_USERNAME`, `DM_PASSWORD`: resource owner, password grant only
//! - `DM_TOKEN_PATH`: token file (default `dm_token.json`)
//! - `DM_MAX_RETRIES`: polling retry budget (unset polls until done)
//! - `DM_BASE_DELAY_SECS`: first polling backoff delay
//! - `DM_FANOUT_CONCURRENCY`: concurrent detail lookups
//! - `DM_HTTP_TIMEOUT_SECS`, `DM_HTTP_MAX_ATTEMPTS`: transport settings
//! - `DM_EXPIRED_TOKEN_POLICY`: `regenerate` (default) or `fail`
//!
//! ## File Locations
//! The loader probes `reportflow.{json,toml}` and `config.{json,toml}` in the
//! working directory, its parent, and next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use reportflow_domain::constants::DEFAULT_TOKEN_PATH;
use reportflow_domain::{
    CredentialConfig, EndpointConfig, ExpiredTokenPolicy, FanoutConfig, GrantType, HttpConfig,
    PipelineConfig, PollingConfig, ReportFlowError, Result,
};
use reqwest::Url;
use secrecy::SecretString;

/// Variables whose presence means the environment is meant to configure us.
const REQUIRED_VARS: [&str; 5] =
    ["DM_AUTH_URL", "DM_GRAPH_URL", "DM_REST_URL", "DM_CLIENT_API", "DM_CLIENT_SECRET"];

/// Load configuration with automatic fallback strategy
///
/// Loads from environment variables when any required one is set. Only when
/// none is set does it fall back to a config file.
///
/// # Errors
/// Returns the environment error when the environment is partially or
/// wrongly set. Otherwise returns `ReportFlowError::Config` naming both the
/// file failure and the missing variables.
pub fn load() -> Result<PipelineConfig> {
    load_with(|key| std::env::var(key).ok(), || load_from_file(None))
}

fn load_with<F, P>(lookup: F, from_file: P) -> Result<PipelineConfig>
where
    F: Fn(&str) -> Option<String>,
    P: FnOnce() -> Result<PipelineConfig>,
{
    let env_in_use =
        REQUIRED_VARS.iter().any(|key| lookup(key).is_some_and(|v| !v.trim().is_empty()));

    match load_from_vars(&lookup) {
        Ok(config) => {
            tracing::info!("configuration loaded from environment variables");
            Ok(config)
        }
        Err(err) if env_in_use => Err(err),
        Err(env_err) => {
            tracing::debug!(error = %env_err, "no environment configuration, trying file");
            from_file().map_err(|file_err| {
                ReportFlowError::Config(format!(
                    "{}; environment: {}",
                    config_detail(&file_err),
                    config_detail(&env_err)
                ))
            })
        }
    }
}

/// Load configuration from the process environment
///
/// See module documentation for the variables read.
///
/// # Errors
/// Returns `ReportFlowError::Config` if required variables are missing or
/// have invalid values, and the credential errors of
/// [`PipelineConfig::validate`].
pub fn load_from_env() -> Result<PipelineConfig> {
    load_from_vars(|key| std::env::var(key).ok())
}

/// Load configuration from an arbitrary variable lookup.
///
/// Empty values count as unset.
pub fn load_from_vars<F>(lookup: F) -> Result<PipelineConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let required = |key: &str| {
        var(key).ok_or_else(|| {
            ReportFlowError::Config(format!("missing required environment variable: {key}"))
        })
    };

    let endpoints = EndpointConfig {
        auth_url: url_var(&required, "DM_AUTH_URL")?,
        graph_url: url_var(&required, "DM_GRAPH_URL")?,
        rest_url: url_var(&required, "DM_REST_URL")?,
    };

    let grant_type = var("DM_GRANT_TYPE").map(|g| GrantType::from_str(&g)).transpose()?;
    let credentials = CredentialConfig {
        client_id: required("DM_CLIENT_API")?,
        client_secret: SecretString::from(required("DM_CLIENT_SECRET")?),
        grant_type: grant_type.unwrap_or_default(),
        scopes: var("DM_SCOPES").map(|s| split_scopes(&s)).unwrap_or_default(),
        username: var("DM_USERNAME"),
        password: lookup("DM_PASSWORD").filter(|p| !p.is_empty()).map(SecretString::from),
    };

    let polling = PollingConfig {
        max_retries: parse_var(&var, "DM_MAX_RETRIES")?,
        base_delay_secs: parse_var(&var, "DM_BASE_DELAY_SECS")?
            .unwrap_or(PollingConfig::default().base_delay_secs),
    };
    let fanout = FanoutConfig {
        concurrency: parse_var(&var, "DM_FANOUT_CONCURRENCY")?
            .unwrap_or(FanoutConfig::default().concurrency),
    };
    let http = HttpConfig {
        timeout_secs: parse_var(&var, "DM_HTTP_TIMEOUT_SECS")?
            .unwrap_or(HttpConfig::default().timeout_secs),
        max_attempts: parse_var(&var, "DM_HTTP_MAX_ATTEMPTS")?
            .unwrap_or(HttpConfig::default().max_attempts),
    };
    let expired_token_policy = var("DM_EXPIRED_TOKEN_POLICY")
        .map(|p| ExpiredTokenPolicy::from_str(&p))
        .transpose()?
        .unwrap_or_default();

    let config = PipelineConfig {
        endpoints,
        credentials,
        token_path: PathBuf::from(var("DM_TOKEN_PATH").as_deref().unwrap_or(DEFAULT_TOKEN_PATH)),
        polling,
        fanout,
        http,
        expired_token_policy,
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `ReportFlowError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - Required fields are missing
pub fn load_from_file(path: Option<PathBuf>) -> Result<PipelineConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ReportFlowError::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            ReportFlowError::Config("no config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ReportFlowError::Config(format!("failed to read config file: {e}")))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<PipelineConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ReportFlowError::Config(format!("invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ReportFlowError::Config(format!("invalid JSON format: {e}"))),
        _ => Err(ReportFlowError::Config(format!("unsupported config format: {extension}"))),
    }
}

/// Probe multiple paths for configuration files
///
/// Returns the first existing candidate, or `None`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut roots = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        roots.push(cwd.clone());
        roots.push(cwd.join(".."));
    }
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            roots.push(exe_dir.to_path_buf());
        }
    }

    roots
        .iter()
        .flat_map(|root| {
            ["reportflow.json", "reportflow.toml", "config.json", "config.toml"]
                .map(|name| root.join(name))
        })
        .find(|path| path.exists())
}

fn config_detail(err: &ReportFlowError) -> String {
    match err {
        ReportFlowError::Config(message) => message.clone(),
        other => other.to_string(),
    }
}

fn url_var<F>(required: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Result<String>,
{
    let value = required(key)?;
    Url::parse(&value)
        .map_err(|e| ReportFlowError::Config(format!("{key} is not a valid URL: {e}")))?;
    Ok(value)
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| ReportFlowError::Config(format!("invalid value for {key}: {e}")))
        })
        .transpose()
}

fn split_scopes(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
