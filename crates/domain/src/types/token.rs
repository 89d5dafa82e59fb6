//! Access token models
//!
//! [`IssuedToken`] is what the auth endpoint answers (lifetime as a duration).
//! [`Token`] is the persisted form, where the lifetime has been converted to an
//! absolute expiry exactly once by the token store.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Token as returned by the authorization server, before persistence.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Lifetime in seconds, relative to the moment the token was issued
    pub expires_in: i64,
    #[serde(default)]
    pub scope: String,
    pub token_type: String,
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Persisted access token with an absolute expiry.
///
/// The on-disk field is still called `expires_in` but holds epoch seconds.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry, Unix epoch seconds
    #[serde(rename = "expires_in")]
    pub expires_at: i64,
    pub scope: String,
    pub token_type: String,
}

impl Token {
    /// Anchor an issued token at `now` (epoch seconds).
    #[must_use]
    pub fn from_issued(issued: IssuedToken, now: i64) -> Self {
        Self {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            expires_at: now.saturating_add(issued.expires_in),
            scope: issued.scope,
            token_type: issued.token_type,
        }
    }

    /// `true` once `now` has reached the expiry (inclusive).
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }

    /// [`Token::is_expired_at`] against the wall clock.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    /// Value for the `Authorization` header, e.g. `Bearer abc123`.
    #[must_use]
    pub fn authorization_header_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish()
    }
}
