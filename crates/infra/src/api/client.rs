//! Authenticated client for the platform's GraphQL and REST APIs
//!
//! Every authenticated call goes through [`ApiClient::ensure_fresh`], which
//! swaps in a new token (and the matching `Authorization` header) once the held
//! one has expired.

use std::sync::Arc;

use async_trait::async_trait;
use reportflow_core::{ReportApi, TokenProvider};
use reportflow_domain::{EndpointConfig, ReportFlowError, Result, Token};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::errors::InfraError;
use crate::http::HttpClient;

/// Endpoints used by [`ApiClient`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiClientConfig {
    /// Structured-query (GraphQL) endpoint
    pub graph_url: String,
    /// Base URL for field queries; paths are appended after a `/`
    pub rest_url: String,
}

impl From<&EndpointConfig> for ApiClientConfig {
    fn from(endpoints: &EndpointConfig) -> Self {
        Self { graph_url: endpoints.graph_url.clone(), rest_url: endpoints.rest_url.clone() }
    }
}

/// Token and the header derived from it, always replaced together.
struct Session {
    token: Token,
    authorization: HeaderValue,
}

impl Session {
    fn new(token: Token) -> Result<Self> {
        let mut authorization = HeaderValue::from_str(&token.authorization_header_value())
            .map_err(|_| {
                ReportFlowError::auth_failed("access token contains invalid header characters")
            })?;
        authorization.set_sensitive(true);
        Ok(Self { token, authorization })
    }
}

/// API client bound to one token provider and one HTTP session
pub struct ApiClient {
    http: HttpClient,
    auth: Arc<dyn TokenProvider>,
    config: ApiClientConfig,
    session: RwLock<Session>,
}

impl ApiClient {
    /// Obtain a token from `auth` and create the client.
    ///
    /// # Errors
    ///
    /// Returns whatever the provider fails with.
    pub async fn connect(
        config: ApiClientConfig,
        http: HttpClient,
        auth: Arc<dyn TokenProvider>,
    ) -> Result<Self> {
        let token = auth.get_token().await?;
        let session = Session::new(token)?;
        info!(graph_url = %config.graph_url, "API client ready");
        Ok(Self { http, auth, config, session: RwLock::new(session) })
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// Token currently attached to requests.
    pub async fn current_token(&self) -> Token {
        self.session.read().await.token.clone()
    }

    /// Make sure the held token is usable and return the header to send.
    ///
    /// When the token has expired a new one is requested from the provider
    /// and the token and header are swapped under a single write lock.
    pub async fn ensure_fresh(&self) -> Result<HeaderValue> {
        {
            let session = self.session.read().await;
            if !session.token.is_expired() {
                return Ok(session.authorization.clone());
            }
        }

        let mut session = self.session.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if session.token.is_expired() {
            debug!(expired_at = session.token.expires_at, "held token expired, renewing");
            *session = Session::new(self.auth.get_token().await?)?;
        }
        Ok(session.authorization.clone())
    }

    /// Run a GraphQL query.
    ///
    /// # Errors
    ///
    /// - `ClientDecode` when the body is not JSON
    /// - `Report` with the first message of a non-empty `errors` array
    /// - `Api` for other non-success statuses
    #[instrument(skip_all, fields(url = %self.config.graph_url))]
    pub async fn execute_structured_query(
        &self,
        query: &str,
        variables: &Map<String, Value>,
    ) -> Result<Value> {
        let authorization = self.ensure_fresh().await?;
        let body = json!({ "query": query, "variables": variables });

        let request = self
            .http
            .request(Method::POST, &self.config.graph_url)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/json")
            .json(&body);
        let response = self.http.send(request).await?;
        let status = response.status();
        let payload = decode_json(response).await?;

        if let Some(message) = first_graphql_error(&payload) {
            warn!(%status, error = %message, "structured query returned errors");
            return Err(ReportFlowError::Report(message));
        }
        if !status.is_success() {
            return Err(ReportFlowError::Api(format!(
                "{} returned status {status}",
                self.config.graph_url
            )));
        }

        Ok(payload)
    }

    /// Run a field-selection query against `{rest_url}/{path}`.
    ///
    /// The form body holds `extra_params` followed by `fields` joined with
    /// commas.
    #[instrument(skip(self, fields, extra_params), fields(path = %path))]
    pub async fn execute_field_query(
        &self,
        path: &str,
        fields: &[String],
        extra_params: &[(String, String)],
    ) -> Result<Value> {
        let authorization = self.ensure_fresh().await?;
        let url = self.rest_url(path);

        let mut form: Vec<(&str, String)> =
            extra_params.iter().map(|(key, value)| (key.as_str(), value.clone())).collect();
        form.push(("fields", fields.join(",")));

        let request = self
            .http
            .request(Method::POST, &url)
            .header(AUTHORIZATION, authorization)
            .form(&form);
        let response = self.http.send(request).await?;
        let status = response.status();
        let payload = decode_json(response).await?;

        if let Some(error) = payload.get("error").filter(|error| is_truthy(error)) {
            let message = error_message(error);
            warn!(%status, error = %message, "field query returned an error");
            return Err(ReportFlowError::Api(message));
        }
        if !status.is_success() {
            return Err(ReportFlowError::Api(format!("{url} returned status {status}")));
        }

        debug!("field query succeeded");
        Ok(payload)
    }

    /// Fetch an exported report.
    #[instrument(skip(self))]
    pub async fn download_report(&self, link: &str) -> Result<String> {
        let response = self.http.send(self.http.request(Method::GET, link)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReportFlowError::Api(format!(
                "report download returned status {status}"
            )));
        }

        let body = response.text().await.map_err(InfraError::from)?;
        info!(bytes = body.len(), "report downloaded");
        Ok(body)
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.rest_url.trim_end_matches('/'), path.trim_matches('/'))
    }
}

#[async_trait]
impl ReportApi for ApiClient {
    async fn execute_structured_query(
        &self,
        query: &str,
        variables: &Map<String, Value>,
    ) -> Result<Value> {
        ApiClient::execute_structured_query(self, query, variables).await
    }

    async fn execute_field_query(
        &self,
        path: &str,
        fields: &[String],
        extra_params: &[(String, String)],
    ) -> Result<Value> {
        ApiClient::execute_field_query(self, path, fields, extra_params).await
    }

    async fn download_report(&self, link: &str) -> Result<String> {
        ApiClient::download_report(self, link).await
    }
}

/// Builder for API client
#[derive(Default)]
pub struct ApiClientBuilder {
    config: Option<ApiClientConfig>,
    http: Option<HttpClient>,
    auth: Option<Arc<dyn TokenProvider>>,
}

impl ApiClientBuilder {
    /// Set the endpoints
    pub fn config(mut self, config: ApiClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Reuse an existing HTTP client
    pub fn http(mut self, http: HttpClient) -> Self {
        self.http = Some(http);
        self
    }

    /// Set the token provider
    pub fn auth(mut self, auth: Arc<dyn TokenProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Build the client, fetching the initial token.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the endpoints or token provider are missing.
    pub async fn connect(self) -> Result<ApiClient> {
        let config =
            self.config.ok_or_else(|| ReportFlowError::Config("API endpoints not set".into()))?;
        let auth =
            self.auth.ok_or_else(|| ReportFlowError::Config("token provider not set".into()))?;
        let http = match self.http {
            Some(http) => http,
            None => HttpClient::new()?,
        };

        ApiClient::connect(config, http, auth).await
    }
}

async fn decode_json(response: Response) -> Result<Value> {
    let status = response.status();
    let text = response.text().await.map_err(InfraError::from)?;

    let payload = serde_json::from_str(&text).map_err(|err| {
        let preview: String = text.chars().take(200).collect();
        warn!(%status, body = %preview, "response is not JSON");
        InfraError::from(err)
    })?;
    Ok(payload)
}

fn first_graphql_error(payload: &Value) -> Option<String> {
    let first = payload.get("errors")?.as_array()?.first()?;
    Some(match first.get("message").and_then(Value::as_str) {
        Some(message) => message.to_string(),
        None => first.to_string(),
    })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn error_message(error: &Value) -> String {
    match error {
        Value::String(message) => message.clone(),
        Value::Object(map) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string()),
        other => other.to_string(),
    }
}
