//! Client credentials for the platform's token endpoint

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::errors::{ReportFlowError, Result};

/// OAuth2 grant used to obtain the first token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    #[default]
    ClientCredentials,
    Password,
}

impl GrantType {
    /// Wire value of the `grant_type` form field.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ClientCredentials => "client_credentials",
            Self::Password => "password",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GrantType {
    type Err = ReportFlowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "client_credentials" => Ok(Self::ClientCredentials),
            "password" => Ok(Self::Password),
            other => Err(ReportFlowError::InvalidGrantConfig(format!(
                "unsupported grant type '{other}' (expected client_credentials or password)"
            ))),
        }
    }
}

/// Validated client credential.
///
/// Can only be built through constructors that enforce the grant invariants,
/// so holding one means the credential is usable.
#[derive(Debug)]
pub struct Credential {
    client_id: String,
    client_secret: SecretString,
    grant: Grant,
    scopes: Vec<String>,
}

/// Grant type together with the fields only that grant carries.
#[derive(Debug)]
enum Grant {
    ClientCredentials,
    Password { username: String, password: SecretString },
}

impl Credential {
    /// Build and validate a credential.
    ///
    /// # Errors
    /// - [`ReportFlowError::InvalidCredential`] when the client id or secret is empty
    /// - [`ReportFlowError::InvalidGrantConfig`] when the password grant lacks a
    ///   username or password
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        grant_type: GrantType,
        scopes: impl IntoIterator<Item = impl Into<String>>,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();

        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            return Err(ReportFlowError::InvalidCredential(format!(
                "client id and client secret are required (client id present: {}, secret present: {})",
                !client_id.trim().is_empty(),
                !client_secret.trim().is_empty()
            )));
        }

        let username = username.filter(|u| !u.trim().is_empty());
        let password = password.filter(|p| !p.is_empty());

        let grant = match grant_type {
            GrantType::Password => match (username, password) {
                (Some(username), Some(password)) => {
                    Grant::Password { username, password: SecretString::from(password) }
                }
                (user, pass) => {
                    return Err(ReportFlowError::InvalidGrantConfig(format!(
                        "username and password are required for password grant type (username present: {}, password present: {})",
                        user.is_some(),
                        pass.is_some()
                    )));
                }
            },
            GrantType::ClientCredentials => Grant::ClientCredentials,
        };

        let mut unique = Vec::new();
        for scope in scopes {
            let scope = scope.into();
            if !scope.is_empty() && !unique.contains(&scope) {
                unique.push(scope);
            }
        }

        Ok(Self {
            client_id,
            client_secret: SecretString::from(client_secret),
            grant,
            scopes: unique,
        })
    }

    /// Credential for the client-credentials grant.
    pub fn client_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        scopes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        Self::new(client_id, client_secret, GrantType::ClientCredentials, scopes, None, None)
    }

    /// Credential for the resource-owner password grant.
    pub fn password(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        scopes: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self> {
        Self::new(
            client_id,
            client_secret,
            GrantType::Password,
            scopes,
            Some(username.into()),
            Some(password.into()),
        )
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    pub fn grant_type(&self) -> GrantType {
        match self.grant {
            Grant::ClientCredentials => GrantType::ClientCredentials,
            Grant::Password { .. } => GrantType::Password,
        }
    }

    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Scopes as the space-separated string expected by the token endpoint.
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }

    /// Username and password. `Some` exactly when the grant is
    /// [`GrantType::Password`].
    pub fn user_credentials(&self) -> Option<(&str, &str)> {
        match &self.grant {
            Grant::Password { username, password } => {
                Some((username.as_str(), password.expose_secret()))
            }
            Grant::ClientCredentials => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_credentials_ignores_user_fields() {
        let credential = Credential::new(
            "id",
            "secret",
            GrantType::ClientCredentials,
            ["create_reports"],
            Some("someone".into()),
            None,
        )
        .unwrap();

        assert_eq!(credential.grant_type(), GrantType::ClientCredentials);
        assert!(credential.user_credentials().is_none());
    }

    #[test]
    fn rejects_missing_client_secret() {
        let err = Credential::client_credentials("id", "", ["create_reports"]).unwrap_err();
        assert!(matches!(err, ReportFlowError::InvalidCredential(_)));
    }

    #[test]
    fn rejects_missing_client_id() {
        let err = Credential::client_credentials("  ", "secret", ["create_reports"]).unwrap_err();
        assert!(matches!(err, ReportFlowError::InvalidCredential(_)));
    }

    #[test]
    fn password_grant_requires_both_user_fields() {
        let cases = [(None, Some("pw")), (Some("me"), None), (Some(""), Some("pw")), (None, None)];
        for (user, pass) in cases {
            let err = Credential::new(
                "id",
                "secret",
                GrantType::Password,
                ["create_reports"],
                user.map(str::to_string),
                pass.map(str::to_string),
            )
            .unwrap_err();
            assert!(
                matches!(err, ReportFlowError::InvalidGrantConfig(_)),
                "unexpected error for {user:?}/{pass:?}: {err}"
            );
        }
    }

    #[test]
    fn password_grant_keeps_user_fields() {
        let credential =
            Credential::password("id", "secret", "me", "pw", ["manage_reports"]).unwrap();
        assert_eq!(credential.grant_type(), GrantType::Password);
        assert_eq!(credential.user_credentials(), Some(("me", "pw")));
    }

    #[test]
    fn user_fields_present_only_for_password_grant() {
        let user = || Some("me".to_string());
        let pass = || Some("pw".to_string());
        let credentials = [
            Credential::client_credentials("id", "secret", ["x"]).unwrap(),
            Credential::password("id", "secret", "me", "pw", ["x"]).unwrap(),
            Credential::new("id", "secret", GrantType::Password, ["x"], user(), pass()).unwrap(),
            Credential::new("id", "secret", GrantType::ClientCredentials, ["x"], user(), pass())
                .unwrap(),
        ];
        for credential in &credentials {
            assert_eq!(
                credential.user_credentials().is_some(),
                credential.grant_type() == GrantType::Password,
                "{credential:?}"
            );
        }
    }

    #[test]
    fn scopes_are_deduplicated_in_order() {
        let credential = Credential::client_credentials(
            "id",
            "secret",
            ["create_reports", "delete_reports", "create_reports", "manage_reports"],
        )
        .unwrap();
        assert_eq!(credential.scope_string(), "create_reports delete_reports manage_reports");
    }

    #[test]
    fn debug_never_prints_secret() {
        let credential =
            Credential::password("id", "super-secret", "me", "hunter2", ["x"]).unwrap();
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn parses_grant_type_names() {
        assert_eq!("password".parse::<GrantType>().unwrap(), GrantType::Password);
        assert_eq!(
            "client_credentials".parse::<GrantType>().unwrap(),
            GrantType::ClientCredentials
        );
        assert!("implicit".parse::<GrantType>().is_err());
    }
}
