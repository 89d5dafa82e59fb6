//! Report polling results and enrichment records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ReportFlowError, Result};

/// Outcome of polling a batch of report jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLinks {
    /// Download links found in the final status response, in response order
    pub links: Vec<String>,
    /// Reports still `IN_PROGRESS` when polling stopped
    pub in_progress: usize,
    /// Number of status requests issued
    pub polls: u32,
}

impl ReportLinks {
    /// `true` when no report was left in progress.
    pub fn is_complete(&self) -> bool {
        self.in_progress == 0
    }

    /// Turn a partial result into an error.
    ///
    /// # Errors
    /// [`ReportFlowError::Report`] when reports were still in progress after the
    /// retry budget ran out.
    pub fn ensure_complete(self) -> Result<Self> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(ReportFlowError::Report(format!(
                "{} report(s) still in progress after {} poll(s)",
                self.in_progress, self.polls
            )))
        }
    }

    pub fn into_links(self) -> Vec<String> {
        self.links
    }
}

/// Metadata fetched for a single entity over REST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDetails {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl EntityDetails {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self { id: id.into(), fields }
    }

    /// Field map with every key renamed to `{resource}_{key}`.
    ///
    /// Used to join details for several resource kinds into one flat row.
    pub fn prefixed(&self, resource: &str) -> Map<String, Value> {
        let prefix = resource.to_lowercase();
        self.fields
            .iter()
            .map(|(key, value)| (format!("{prefix}_{key}"), value.clone()))
            .collect()
    }
}
