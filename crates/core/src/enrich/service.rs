//! Bounded fan-out over the field-query API

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use reportflow_domain::constants::DEFAULT_FANOUT_CONCURRENCY;
use reportflow_domain::{EntityDetails, ReportFlowError, Result};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::report::ports::ReportApi;

/// Fetches details for many entities with a cap on in-flight requests.
pub struct DetailFetcher {
    api: Arc<dyn ReportApi>,
    concurrency: usize,
}

impl DetailFetcher {
    pub fn new(api: Arc<dyn ReportApi>) -> Self {
        Self { api, concurrency: DEFAULT_FANOUT_CONCURRENCY }
    }

    /// Maximum number of lookups in flight. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Look up `fields` of every `{resource}/{id}`.
    ///
    /// Duplicate ids are fetched once. Results keep the order of first
    /// appearance. Lookups that fail are logged and left out, so this never
    /// fails as a whole.
    #[instrument(skip(self, ids, fields), fields(ids = ids.len()))]
    pub async fn fetch_details(
        &self,
        resource: &str,
        ids: &[String],
        fields: &[String],
    ) -> Vec<EntityDetails> {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = ids.iter().filter(|id| seen.insert(id.as_str())).collect();

        let results: Vec<(&String, Result<EntityDetails>)> = stream::iter(unique)
            .map(|id| async move { (id, self.fetch_one(resource, id, fields).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut details = Vec::with_capacity(results.len());
        for (id, result) in results {
            match result {
                Ok(entity) => details.push(entity),
                Err(err) => warn!(resource, id = %id, error = %err, "detail lookup failed"),
            }
        }
        debug!(fetched = details.len(), "detail lookups finished");
        details
    }

    async fn fetch_one(
        &self,
        resource: &str,
        id: &str,
        fields: &[String],
    ) -> Result<EntityDetails> {
        let path = format!("{}/{}", resource.trim_matches('/'), id);
        match self.api.execute_field_query(&path, fields, &[]).await? {
            Value::Object(map) => Ok(EntityDetails::new(id, map)),
            other => Err(ReportFlowError::ClientDecode(format!(
                "expected an object for {path}, got {other}"
            ))),
        }
    }
}
