use std::time::Duration;

use reportflow_common::ExponentialBackoff;
use reportflow_domain::{HttpConfig, ReportFlowError};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use tracing::{debug, warn};

use crate::errors::InfraError;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Shared reqwest session for every remote endpoint.
///
/// Idempotent requests are retried on transport failures and 5xx answers, up
/// to `max_attempts` total tries. Other methods (the GraphQL and field-query
/// POSTs, token requests) are only retried when the connection could not be
/// opened, since the server never saw them. Every other answer is returned to
/// the caller as-is; status handling stays with the adapters.
#[derive(Clone)]
pub struct HttpClient {
    inner: ReqwestClient,
    max_attempts: u32,
    backoff: ExponentialBackoff,
}

/// What to do with the result of one attempt.
enum Attempt {
    Done(Response),
    Failed(reqwest::Error),
    RetryAfter(Duration),
}

impl HttpClient {
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Client with the default `http` settings.
    pub fn new() -> Result<Self, ReportFlowError> {
        Self::builder().build()
    }

    /// Client configured from the `http` section of the pipeline config.
    pub fn from_config(config: &HttpConfig) -> Result<Self, ReportFlowError> {
        Self::builder().timeout(config.timeout()).max_attempts(config.max_attempts).build()
    }

    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.inner.request(method, url)
    }

    /// Send `builder`, retrying transient failures.
    ///
    /// The body must be buffered (JSON or form) so the request can be cloned
    /// for every attempt.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, ReportFlowError> {
        let mut attempt: u32 = 0;
        loop {
            let request = builder
                .try_clone()
                .ok_or_else(|| {
                    ReportFlowError::Internal("streaming request bodies cannot be retried".into())
                })?
                .build()
                .map_err(InfraError::from)?;
            let method = request.method().clone();
            let url = request.url().clone();
            let replayable = method.is_idempotent();
            let is_last = attempt + 1 >= self.max_attempts;

            let outcome = match self.inner.execute(request).await {
                Ok(response)
                    if replayable && response.status().is_server_error() && !is_last =>
                {
                    Attempt::RetryAfter(self.backoff.delay_for(attempt))
                }
                Ok(response) => Attempt::Done(response),
                Err(err) if is_retryable(&err, replayable) && !is_last => {
                    debug!(%method, %url, error = %err, "transport failure");
                    Attempt::RetryAfter(self.backoff.delay_for(attempt))
                }
                Err(err) => Attempt::Failed(err),
            };

            match outcome {
                Attempt::Done(response) => {
                    let status = response.status();
                    debug!(%method, %url, %status, tries = attempt + 1, "response");
                    return Ok(response);
                }
                Attempt::Failed(err) => {
                    warn!(%method, %url, error = %err, tries = attempt + 1, "request failed");
                    return Err(InfraError::from(err).into());
                }
                Attempt::RetryAfter(delay) => {
                    debug!(%method, %url, attempt, ?delay, "retrying");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    max_attempts: u32,
    base_backoff: Duration,
    user_agent: String,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        let defaults = HttpConfig::default();
        Self {
            timeout: defaults.timeout(),
            max_attempts: u32::try_from(defaults.max_attempts).unwrap_or(1),
            base_backoff: Duration::from_millis(200),
            user_agent: concat!("reportflow/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpClientBuilder {
    /// Per-request timeout, covering connect through body.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total tries per request; zero is treated as one.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = u32::try_from(attempts).unwrap_or(u32::MAX).max(1);
        self
    }

    /// First retry delay, doubled per retry up to 30 seconds.
    pub fn base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn build(self) -> Result<HttpClient, ReportFlowError> {
        let inner = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .no_proxy()
            .build()
            .map_err(InfraError::from)?;

        Ok(HttpClient {
            inner,
            max_attempts: self.max_attempts.max(1),
            backoff: ExponentialBackoff::new(self.base_backoff).with_max_delay(MAX_RETRY_DELAY),
        })
    }
}

/// Connect failures never reached the server; anything later may have.
fn is_retryable(err: &reqwest::Error, replayable: bool) -> bool {
    err.is_connect() || (replayable && (err.is_timeout() || err.is_request()))
}
