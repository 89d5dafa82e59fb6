//! OAuth token endpoint adapter

use async_trait::async_trait;
use reportflow_core::{TokenIssuer, TokenRequest};
use reportflow_domain::{IssuedToken, ReportFlowError, Result};
use reqwest::{Method, StatusCode};
use tracing::{debug, instrument, warn};

use crate::errors::InfraError;
use crate::http::HttpClient;

/// Posts form-encoded token requests to the authorization server.
#[derive(Clone)]
pub struct HttpTokenIssuer {
    http: HttpClient,
    auth_url: String,
}

impl HttpTokenIssuer {
    pub fn new(http: HttpClient, auth_url: impl Into<String>) -> Self {
        Self { http, auth_url: auth_url.into() }
    }
}

#[async_trait]
impl TokenIssuer for HttpTokenIssuer {
    #[instrument(
        skip(self, request),
        fields(url = %self.auth_url, grant_type = request.get("grant_type"))
    )]
    async fn request_token(&self, request: &TokenRequest) -> Result<IssuedToken> {
        let builder = self.http.request(Method::POST, &self.auth_url).form(request.params());
        let response = self.http.send(builder).await?;
        let status = response.status();

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "token endpoint rejected the request");
            let message = if body.is_empty() {
                format!("token endpoint returned {status}")
            } else {
                format!("token endpoint returned {status}: {body}")
            };
            return Err(ReportFlowError::AuthenticationFailed {
                message,
                status: Some(status.as_u16()),
            });
        }

        let body = response.text().await.map_err(InfraError::from)?;
        let issued: IssuedToken = serde_json::from_str(&body).map_err(InfraError::from)?;

        debug!(expires_in = issued.expires_in, "token endpoint issued a token");
        Ok(issued)
    }
}
