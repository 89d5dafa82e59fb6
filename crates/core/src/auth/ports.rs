//! Port interfaces for token management
//!
//! These traits define the boundaries between the token lifecycle policy and
//! the infrastructure that talks to the auth endpoint or the disk.

use std::fmt;

use async_trait::async_trait;
use reportflow_domain::{IssuedToken, Result, Token};

/// Form body for the OAuth token endpoint.
///
/// Parameter order is preserved. Values may contain secrets, so `Debug` only
/// prints parameter names.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenRequest {
    params: Vec<(&'static str, String)>,
}

impl TokenRequest {
    pub fn new(params: Vec<(&'static str, String)>) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &[(&'static str, String)] {
        &self.params
    }

    /// Value of a single form parameter.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.iter().find(|(key, _)| *key == name).map(|(_, value)| value.as_str())
    }
}

impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.params.iter().map(|(key, _)| *key).collect();
        f.debug_struct("TokenRequest").field("params", &names).finish()
    }
}

/// Trait for the authorization server's token endpoint
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Post a token request.
    ///
    /// Implementations return [`ReportFlowError::AuthenticationFailed`] for
    /// any non-200 answer.
    ///
    /// [`ReportFlowError::AuthenticationFailed`]: reportflow_domain::ReportFlowError::AuthenticationFailed
    async fn request_token(&self, request: &TokenRequest) -> Result<IssuedToken>;
}

/// Trait for persisting the current token
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Load the persisted token.
    ///
    /// `NotFound` when nothing was persisted yet, `StorageRead` when the store
    /// exists but cannot be read, `MalformedData` when the stored payload
    /// cannot be parsed.
    async fn load(&self) -> Result<Token>;

    /// Anchor `issued` at `now` (epoch seconds), persist it, overwriting any
    /// previous token, and return what was written.
    async fn dump(&self, issued: IssuedToken, now: i64) -> Result<Token>;
}

/// Source of valid tokens for authenticated clients
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Return a token that is not expired at the time of the call.
    async fn get_token(&self) -> Result<Token>;
}
