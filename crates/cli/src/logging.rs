//! Tracing subscriber setup
//!
//! Priority order for the filter:
//! 1. `-v` flags
//! 2. `RUST_LOG`
//! 3. [`DEFAULT_FILTER`]

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "reportflow=info";

/// Install the global subscriber. Logs go to stderr so stdout stays usable
/// for command output.
pub fn init(verbose: u8, json: bool) -> Result<()> {
    let filter = build_filter(verbose, std::env::var("RUST_LOG").ok().as_deref())?;
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

fn build_filter(verbose: u8, rust_log: Option<&str>) -> Result<EnvFilter> {
    let directive = match (verbose, rust_log) {
        (0, Some(env)) if !env.trim().is_empty() => env.to_string(),
        (0, _) => DEFAULT_FILTER.to_string(),
        (1, _) => "reportflow=debug".to_string(),
        _ => "reportflow=trace,reqwest=debug".to_string(),
    };
    Ok(EnvFilter::try_new(directive)?)
}
