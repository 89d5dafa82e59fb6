//! Port interface for the platform's reporting and REST APIs

use async_trait::async_trait;
use reportflow_domain::Result;
use serde_json::{Map, Value};

/// Trait for authenticated calls against the platform
#[async_trait]
pub trait ReportApi: Send + Sync {
    /// Run a structured (GraphQL) query and return the decoded response body.
    ///
    /// A non-empty top-level `errors` array becomes a `Report` error.
    async fn execute_structured_query(
        &self,
        query: &str,
        variables: &Map<String, Value>,
    ) -> Result<Value>;

    /// Run a field-selection REST query against `path`.
    ///
    /// A truthy top-level `error` member becomes an `Api` error.
    async fn execute_field_query(
        &self,
        path: &str,
        fields: &[String],
        extra_params: &[(String, String)],
    ) -> Result<Value>;

    /// Download one exported report and return its body.
    async fn download_report(&self, link: &str) -> Result<String>;
}
