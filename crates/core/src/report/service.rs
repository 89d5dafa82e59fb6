//! Report polling protocol

use std::sync::Arc;
use std::time::Duration;

use reportflow_common::{search_key, ExponentialBackoff};
use reportflow_domain::constants::{
    DEFAULT_BASE_DELAY_SECS, LINK_KEY, REPORT_TOKEN_KEY, STATUS_IN_PROGRESS, STATUS_KEY,
};
use reportflow_domain::{PollingConfig, ReportLinks, Result};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use super::ports::ReportApi;
use super::query::build_status_query;

/// How long to keep polling report status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingOptions {
    /// Backoff retries after the first status request; `None` means unlimited
    pub max_retries: Option<u32>,
    /// Delay before the first retry, doubled on every following one
    pub base_delay: Duration,
}

impl Default for PollingOptions {
    fn default() -> Self {
        Self { max_retries: None, base_delay: Duration::from_secs(DEFAULT_BASE_DELAY_SECS) }
    }
}

impl From<&PollingConfig> for PollingOptions {
    fn from(config: &PollingConfig) -> Self {
        Self { max_retries: config.max_retries, base_delay: config.base_delay() }
    }
}

/// Drives report generation and status polling through a [`ReportApi`].
pub struct ReportService {
    api: Arc<dyn ReportApi>,
}

impl ReportService {
    pub fn new(api: Arc<dyn ReportApi>) -> Self {
        Self { api }
    }

    /// Trigger the reports described by `query`, wait for them and return the
    /// download links.
    ///
    /// Every `reportToken` string in the trigger response is polled in a
    /// single status query. Polling stops once no report is `IN_PROGRESS`, or
    /// when `max_retries` backoff sleeps have been spent; in the latter case the
    /// result carries the number of unfinished reports.
    #[instrument(skip_all, fields(max_retries = ?options.max_retries))]
    pub async fn generate_report_links(
        &self,
        query: &str,
        variables: &Map<String, Value>,
        options: PollingOptions,
    ) -> Result<ReportLinks> {
        let trigger = self.api.execute_structured_query(query, variables).await?;
        let tokens: Vec<&str> =
            search_key(&trigger, REPORT_TOKEN_KEY).filter_map(Value::as_str).collect();
        info!(reports = tokens.len(), "report generation requested");

        let status_query = build_status_query(&tokens);
        let backoff = ExponentialBackoff::new(options.base_delay);
        let mut attempt: u32 = 0;
        let mut polls: u32 = 0;

        let (response, in_progress) = loop {
            let response = self
                .api
                .execute_structured_query(&status_query.query, &status_query.variables)
                .await?;
            polls += 1;

            let in_progress = count_in_progress(&response);
            if in_progress == 0 {
                break (response, in_progress);
            }
            if options.max_retries.is_some_and(|max| attempt >= max) {
                warn!(in_progress, polls, "retry budget exhausted with reports still in progress");
                break (response, in_progress);
            }

            let delay = backoff.delay_for(attempt);
            debug!(in_progress, attempt, ?delay, "reports in progress, backing off");
            tokio::time::sleep(delay).await;
            attempt += 1;
        };

        let links: Vec<String> = search_key(&response, LINK_KEY)
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        info!(links = links.len(), polls, "report polling finished");

        Ok(ReportLinks { links, in_progress, polls })
    }

    /// Download every link in order.
    ///
    /// Stops at the first failure.
    pub async fn download_reports(&self, links: &[String]) -> Result<Vec<String>> {
        let mut bodies = Vec::with_capacity(links.len());
        for link in links {
            bodies.push(self.api.download_report(link).await?);
        }
        Ok(bodies)
    }
}

fn count_in_progress(response: &Value) -> usize {
    search_key(response, STATUS_KEY)
        .filter(|status| status.as_str() == Some(STATUS_IN_PROGRESS))
        .count()
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use reportflow_domain::ReportFlowError;
    use serde_json::json;
    use tokio::time::Instant;

    use super::*;

    /// Answers the trigger query, then replays status responses; the last
    /// status response repeats forever.
    struct ScriptedApi {
        trigger: Value,
        statuses: Mutex<VecDeque<Value>>,
        calls: Mutex<Vec<(String, Map<String, Value>, Instant)>>,
    }

    impl ScriptedApi {
        fn new(trigger: Value, statuses: Vec<Value>) -> Arc<Self> {
            Arc::new(Self {
                trigger,
                statuses: Mutex::new(statuses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn status_calls(&self) -> Vec<(String, Map<String, Value>, Instant)> {
            self.calls.lock().unwrap().iter().skip(1).cloned().collect()
        }
    }

    #[async_trait]
    impl ReportApi for ScriptedApi {
        async fn execute_structured_query(
            &self,
            query: &str,
            variables: &Map<String, Value>,
        ) -> Result<Value> {
            let first = {
                let mut calls = self.calls.lock().unwrap();
                calls.push((query.to_string(), variables.clone(), Instant::now()));
                calls.len() == 1
            };
            if first {
                return Ok(self.trigger.clone());
            }
            let mut statuses = self.statuses.lock().unwrap();
            let next =
                if statuses.len() > 1 { statuses.pop_front() } else { statuses.front().cloned() };
            next.ok_or_else(|| ReportFlowError::Internal("no status scripted".into()))
        }

        async fn execute_field_query(
            &self,
            _path: &str,
            _fields: &[String],
            _extra_params: &[(String, String)],
        ) -> Result<Value> {
            Err(ReportFlowError::Internal("not used".into()))
        }

        async fn download_report(&self, link: &str) -> Result<String> {
            Ok(format!("csv from {link}"))
        }
    }

    fn trigger(tokens: &[&str]) -> Value {
        let reports: Map<String, Value> = tokens
            .iter()
            .enumerate()
            .map(|(i, token)| {
                (
                    format!("report{}", i + 1),
                    json!({"reportFile": {"reportToken": token}}),
                )
            })
            .collect();
        json!({"data": reports})
    }

    fn in_progress() -> Value {
        json!({"data": {"partner": {"report1": {
            "status": "IN_PROGRESS",
            "downloadLinks": {"edges": []}
        }}}})
    }

    fn finished(link: &str) -> Value {
        json!({"data": {"partner": {"report1": {
            "status": "FINISHED",
            "downloadLinks": {"edges": [{"node": {"link": link}}]}
        }}}})
    }

    fn options(max_retries: Option<u32>) -> PollingOptions {
        PollingOptions { max_retries, base_delay: Duration::from_secs(1) }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_until_ready_with_base_delay() {
        let api = ScriptedApi::new(
            trigger(&["tok-1"]),
            vec![in_progress(), finished("https://exports.example.com/1.csv")],
        );
        let service = ReportService::new(api.clone());

        let result = service
            .generate_report_links("mutation { x }", &Map::new(), options(None))
            .await
            .unwrap();

        assert_eq!(result.links, vec!["https://exports.example.com/1.csv"]);
        assert!(result.is_complete());
        assert_eq!(result.polls, 2);

        let calls = api.status_calls();
        assert_eq!(calls.len(), 2);
        let gap = calls[1].2 - calls[0].2;
        assert!(gap >= Duration::from_secs(1), "gap was {gap:?}");
        assert!(gap < Duration::from_millis(1100), "gap was {gap:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_makes_exactly_one_status_request() {
        let api = ScriptedApi::new(trigger(&["tok-1"]), vec![in_progress()]);
        let service = ReportService::new(api.clone());

        let start = Instant::now();
        let result = service
            .generate_report_links("mutation { x }", &Map::new(), options(Some(0)))
            .await
            .unwrap();

        assert_eq!(api.status_calls().len(), 1);
        assert_eq!(result.polls, 1);
        assert_eq!(result.in_progress, 1);
        assert!(result.links.is_empty());
        assert!(start.elapsed() < Duration::from_millis(10));
        assert!(result.ensure_complete().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_doubles_between_polls() {
        let api = ScriptedApi::new(trigger(&["tok-1"]), vec![in_progress()]);
        let service = ReportService::new(api.clone());

        let result = service
            .generate_report_links("mutation { x }", &Map::new(), options(Some(3)))
            .await
            .unwrap();

        assert_eq!(result.polls, 4);
        let calls = api.status_calls();
        let gaps: Vec<u64> =
            calls.windows(2).map(|pair| (pair[1].2 - pair[0].2).as_secs()).collect();
        assert_eq!(gaps, vec![1, 2, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn status_query_binds_every_report_token() {
        let api = ScriptedApi::new(trigger(&["a", "b"]), vec![finished("https://x/1.csv")]);
        let service = ReportService::new(api.clone());

        service
            .generate_report_links("mutation { x }", &Map::new(), PollingOptions::default())
            .await
            .unwrap();

        let (query, variables, _) = &api.status_calls()[0];
        assert!(query.contains("$reportToken2: String!"));
        assert_eq!(
            Value::Object(variables.clone()),
            json!({"reportToken1": "a", "reportToken2": "b"})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_tokens_still_polls_once() {
        let api = ScriptedApi::new(json!({"data": {}}), vec![json!({"data": {"partner": {}}})]);
        let service = ReportService::new(api.clone());

        let result = service
            .generate_report_links("mutation { x }", &Map::new(), options(None))
            .await
            .unwrap();

        assert_eq!(result.polls, 1);
        assert!(result.links.is_empty());
        assert!(result.is_complete());
    }

    #[tokio::test]
    async fn downloads_in_order() {
        let api = ScriptedApi::new(json!({}), vec![]);
        let service = ReportService::new(api);

        let bodies = service
            .download_reports(&["https://x/1.csv".to_string(), "https://x/2.csv".to_string()])
            .await
            .unwrap();
        assert_eq!(bodies, vec!["csv from https://x/1.csv", "csv from https://x/2.csv"]);
    }
}
