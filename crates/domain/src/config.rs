//! Pipeline configuration
//!
//! Built once at process start (see `reportflow_infra::config`) and passed by
//! reference into every component. Nothing below the entrypoint reads the
//! environment.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BASE_DELAY_SECS, DEFAULT_FANOUT_CONCURRENCY, DEFAULT_HTTP_MAX_ATTEMPTS,
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_TOKEN_PATH,
};
use crate::errors::{ReportFlowError, Result};
use crate::types::{Credential, GrantType};

/// Top-level configuration
#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    pub endpoints: EndpointConfig,
    pub credentials: CredentialConfig,
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub fanout: FanoutConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub expired_token_policy: ExpiredTokenPolicy,
}

impl PipelineConfig {
    /// Check every invariant that can be checked without I/O.
    ///
    /// # Errors
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        self.endpoints.validate()?;
        self.credentials.credential()?;
        if self.fanout.concurrency == 0 {
            return Err(ReportFlowError::Config("fanout.concurrency must be at least 1".into()));
        }
        Ok(())
    }
}

/// Base URLs of the three remote endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// OAuth token endpoint
    pub auth_url: String,
    /// Structured-query (GraphQL) endpoint
    pub graph_url: String,
    /// Base of the field-query (REST) endpoint
    pub rest_url: String,
}

impl EndpointConfig {
    /// Fail fast on missing or obviously unusable URLs.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("auth_url", &self.auth_url),
            ("graph_url", &self.graph_url),
            ("rest_url", &self.rest_url),
        ] {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(ReportFlowError::Config(format!("endpoint {name} is required")));
            }
            if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
                return Err(ReportFlowError::Config(format!(
                    "endpoint {name} must be an http(s) URL, got '{trimmed}'"
                )));
            }
        }
        Ok(())
    }
}

/// Raw credential settings as read from configuration.
#[derive(Debug, Deserialize)]
pub struct CredentialConfig {
    pub client_id: String,
    pub client_secret: SecretString,
    #[serde(default)]
    pub grant_type: GrantType,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<SecretString>,
}

impl CredentialConfig {
    /// Build the validated [`Credential`].
    pub fn credential(&self) -> Result<Credential> {
        Credential::new(
            self.client_id.clone(),
            self.client_secret.expose_secret().to_owned(),
            self.grant_type,
            self.scopes.iter().cloned(),
            self.username.clone(),
            self.password.as_ref().map(|p| p.expose_secret().to_owned()),
        )
    }
}

/// Report polling settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Backoff retries after the first status poll; `None` polls until done
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
}

impl PollingConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs(self.base_delay_secs)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { max_retries: None, base_delay_secs: DEFAULT_BASE_DELAY_SECS }
    }
}

/// Detail lookup fan-out settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanoutConfig {
    #[serde(default = "default_fanout_concurrency")]
    pub concurrency: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self { concurrency: DEFAULT_FANOUT_CONCURRENCY }
    }
}

/// HTTP transport settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per request for transport failures and 5xx responses
    #[serde(default = "default_http_max_attempts")]
    pub max_attempts: usize,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_attempts: DEFAULT_HTTP_MAX_ATTEMPTS,
        }
    }
}

/// What `get_token` does when a persisted token is expired and refreshing it
/// fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiredTokenPolicy {
    /// Log the refresh failure and request a brand-new token
    #[default]
    Regenerate,
    /// Surface `TokenExpired` to the caller
    Fail,
}

impl std::str::FromStr for ExpiredTokenPolicy {
    type Err = ReportFlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "regenerate" => Ok(Self::Regenerate),
            "fail" => Ok(Self::Fail),
            other => Err(ReportFlowError::Config(format!(
                "unknown expired token policy '{other}' (expected regenerate or fail)"
            ))),
        }
    }
}

fn default_token_path() -> PathBuf {
    PathBuf::from(DEFAULT_TOKEN_PATH)
}

fn default_base_delay_secs() -> u64 {
    DEFAULT_BASE_DELAY_SECS
}

fn default_fanout_concurrency() -> usize {
    DEFAULT_FANOUT_CONCURRENCY
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_http_max_attempts() -> usize {
    DEFAULT_HTTP_MAX_ATTEMPTS
}
