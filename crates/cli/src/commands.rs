//! Subcommands

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use reportflow_core::{Authentication, DetailFetcher, PollingOptions, ReportService};
use reportflow_domain::{EntityDetails, PipelineConfig};
use reportflow_infra::{ApiClient, ApiClientConfig, FileTokenStore, HttpClient, HttpTokenIssuer};
use serde_json::{Map, Value};
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Trigger reports, wait for them and print (or download) their links
    Report(ReportArgs),
    /// Fetch fields of entities through the field-query API
    Details(DetailsArgs),
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// File holding the structured query that triggers the reports
    #[arg(long)]
    pub query_file: PathBuf,
    /// JSON object with the query variables
    #[arg(long)]
    pub variables_file: Option<PathBuf>,
    /// Override the configured polling retry budget
    #[arg(long)]
    pub max_retries: Option<u32>,
    /// Override the configured first backoff delay, in seconds
    #[arg(long)]
    pub base_delay: Option<u64>,
    /// Download every report into this directory
    #[arg(long, short)]
    pub output: Option<PathBuf>,
    /// Fail when reports are still in progress once retries run out
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Args)]
pub struct DetailsArgs {
    /// Resource path segment, e.g. `video`
    #[arg(long)]
    pub resource: String,
    /// Fields to select
    #[arg(long, value_delimiter = ',', required = true)]
    pub fields: Vec<String>,
    /// Entity ids
    #[arg(long, value_delimiter = ',', required = true)]
    pub ids: Vec<String>,
    /// Override the configured fan-out concurrency
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Name output fields `{resource}_{field}`
    #[arg(long)]
    pub prefix: bool,
}

pub async fn run(command: Command, config: &PipelineConfig) -> Result<()> {
    let api = Arc::new(connect(config).await?);
    match command {
        Command::Report(args) => report(api, config, args).await,
        Command::Details(args) => details(api, config, args).await,
    }
}

async fn connect(config: &PipelineConfig) -> Result<ApiClient> {
    let credential = config.credentials.credential()?;
    let http = HttpClient::from_config(&config.http)?;
    let issuer = HttpTokenIssuer::new(http.clone(), config.endpoints.auth_url.clone());
    let store = FileTokenStore::new(&config.token_path);
    let auth = Authentication::new(credential, Arc::new(issuer), Arc::new(store))
        .with_expired_token_policy(config.expired_token_policy);

    let endpoints = ApiClientConfig::from(&config.endpoints);
    let client = ApiClient::connect(endpoints, http, Arc::new(auth))
        .await
        .context("failed to authenticate")?;
    Ok(client)
}

async fn report(api: Arc<ApiClient>, config: &PipelineConfig, args: ReportArgs) -> Result<()> {
    let query = tokio::fs::read_to_string(&args.query_file)
        .await
        .with_context(|| format!("failed to read {}", args.query_file.display()))?;
    let variables = match &args.variables_file {
        Some(path) => read_variables(path).await?,
        None => Map::new(),
    };

    let options = polling_options(config, &args);
    let service = ReportService::new(api);
    let mut result = service.generate_report_links(&query, &variables, options).await?;
    if args.strict {
        result = result.ensure_complete()?;
    }

    {
        let mut stdout = std::io::stdout().lock();
        for link in &result.links {
            writeln!(stdout, "{link}")?;
        }
    }

    if let Some(dir) = &args.output {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
        let bodies = service.download_reports(&result.links).await?;
        for (index, body) in bodies.iter().enumerate() {
            let path = dir.join(format!("report{}.csv", index + 1));
            tokio::fs::write(&path, body)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = body.len(), "report saved");
        }
    }

    Ok(())
}

async fn details(api: Arc<ApiClient>, config: &PipelineConfig, args: DetailsArgs) -> Result<()> {
    let fetcher = DetailFetcher::new(api)
        .with_concurrency(args.concurrency.unwrap_or(config.fanout.concurrency));
    let details = fetcher.fetch_details(&args.resource, &args.ids, &args.fields).await;

    let prefix = args.prefix.then_some(args.resource.as_str());
    let rows: Vec<Value> = details.into_iter().map(|row| flatten(row, prefix)).collect();
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &rows)?;
    writeln!(stdout)?;
    Ok(())
}

fn polling_options(config: &PipelineConfig, args: &ReportArgs) -> PollingOptions {
    let mut options = PollingOptions::from(&config.polling);
    if let Some(max_retries) = args.max_retries {
        options.max_retries = Some(max_retries);
    }
    if let Some(secs) = args.base_delay {
        options.base_delay = Duration::from_secs(secs);
    }
    options
}

async fn read_variables(path: &Path) -> Result<Map<String, Value>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_variables(&raw).with_context(|| format!("invalid variables in {}", path.display()))
}

fn parse_variables(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => bail!("query variables must be a JSON object, got {other}"),
    }
}

/// One flat JSON object per entity, `id` first.
fn flatten(details: EntityDetails, prefix: Option<&str>) -> Value {
    let fields = match prefix {
        Some(resource) => details.prefixed(resource),
        None => details.fields,
    };
    let mut row = Map::with_capacity(fields.len() + 1);
    row.insert("id".to_string(), Value::String(details.id));
    for (key, value) in fields {
        row.entry(key).or_insert(value);
    }
    Value::Object(row)
}
