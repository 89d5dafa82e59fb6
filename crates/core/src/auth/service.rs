//! Token lifecycle service - cache-aside over the token store

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reportflow_domain::{
    Credential, ExpiredTokenPolicy, IssuedToken, ReportFlowError, Result, Token,
};
use secrecy::ExposeSecret;
use tracing::{debug, info, instrument, warn};

use super::ports::{TokenIssuer, TokenProvider, TokenRequest, TokenStore};

/// Issues, refreshes and caches access tokens for one client credential.
pub struct Authentication {
    credential: Credential,
    issuer: Arc<dyn TokenIssuer>,
    store: Arc<dyn TokenStore>,
    policy: ExpiredTokenPolicy,
}

impl Authentication {
    /// Create a new service. The credential was validated when it was built.
    pub fn new(
        credential: Credential,
        issuer: Arc<dyn TokenIssuer>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        Self { credential, issuer, store, policy: ExpiredTokenPolicy::default() }
    }

    /// Choose what happens when an expired token cannot be refreshed.
    pub fn with_expired_token_policy(mut self, policy: ExpiredTokenPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Request a brand-new token with the configured grant. Not persisted.
    #[instrument(skip(self), fields(grant_type = %self.credential.grant_type()))]
    pub async fn generate_token(&self) -> Result<IssuedToken> {
        let request = self.generate_request();
        let issued = self.issuer.request_token(&request).await?;
        debug!(expires_in = issued.expires_in, "token generated");
        Ok(issued)
    }

    /// Exchange the persisted token's refresh token for a new one. Not persisted.
    #[instrument(skip(self))]
    pub async fn refresh_token(&self) -> Result<IssuedToken> {
        let current = self.store.load().await?;
        self.refresh_from(&current).await
    }

    /// Return a usable token, renewing and persisting it when needed.
    #[instrument(skip(self))]
    pub async fn get_token(&self) -> Result<Token> {
        match self.store.load().await {
            Ok(token) if !token.is_expired_at(now()) => {
                debug!("using persisted token");
                Ok(token)
            }
            Ok(expired) => self.renew(expired).await,
            Err(ReportFlowError::NotFound(reason)) => {
                info!(%reason, "no persisted token, generating a new one");
                let issued = self.generate_token().await?;
                self.store.dump(issued, now()).await
            }
            Err(err) => Err(err),
        }
    }

    async fn renew(&self, expired: Token) -> Result<Token> {
        info!(expired_at = expired.expires_at, "persisted token expired, refreshing");

        match self.refresh_from(&expired).await {
            Ok(mut issued) => {
                if issued.refresh_token.is_empty() {
                    issued.refresh_token = expired.refresh_token;
                }
                self.store.dump(issued, now()).await
            }
            Err(cause) => match self.policy {
                ExpiredTokenPolicy::Regenerate => {
                    warn!(error = %cause, "token refresh failed, generating a new token");
                    let issued = self.generate_token().await?;
                    self.store.dump(issued, now()).await
                }
                ExpiredTokenPolicy::Fail => Err(ReportFlowError::TokenExpired {
                    expired_at: expired.expires_at,
                    cause: Some(Box::new(cause)),
                }),
            },
        }
    }

    async fn refresh_from(&self, current: &Token) -> Result<IssuedToken> {
        if current.refresh_token.is_empty() {
            return Err(ReportFlowError::auth_failed("persisted token has no refresh token"));
        }
        self.issuer.request_token(&self.refresh_request(&current.refresh_token)).await
    }

    fn generate_request(&self) -> TokenRequest {
        let credential = &self.credential;
        let mut params = vec![
            ("grant_type", credential.grant_type().as_str().to_string()),
            ("client_id", credential.client_id().to_string()),
            ("client_secret", credential.client_secret().expose_secret().to_string()),
            ("scope", credential.scope_string()),
        ];
        // Only the password grant carries user fields.
        if let Some((username, password)) = credential.user_credentials() {
            params.push(("username", username.to_string()));
            params.push(("password", password.to_string()));
        }
        TokenRequest::new(params)
    }

    fn refresh_request(&self, refresh_token: &str) -> TokenRequest {
        TokenRequest::new(vec![
            ("grant_type", "refresh_token".to_string()),
            ("client_id", self.credential.client_id().to_string()),
            ("client_secret", self.credential.client_secret().expose_secret().to_string()),
            ("refresh_token", refresh_token.to_string()),
        ])
    }
}

#[async_trait]
impl TokenProvider for Authentication {
    async fn get_token(&self) -> Result<Token> {
        Authentication::get_token(self).await
    }
}

fn now() -> i64 {
    Utc::now().timestamp()
}
