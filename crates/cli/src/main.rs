//! `reportflow` command-line entrypoint
//!
//! Reads `.env`, installs logging, builds the pipeline configuration once and
//! hands it to the selected subcommand.

mod commands;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use reportflow_infra::config;
use tracing::debug;

use crate::commands::Command;

#[derive(Debug, Parser)]
#[command(name = "reportflow", version, about = "Video analytics report extraction")]
struct Cli {
    /// Config file (JSON or TOML); environment variables are used when omitted
    #[arg(long, short, global = true, env = "REPORTFLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(long, short, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.json)?;

    if let Ok(path) = dotenv {
        debug!(path = %path.display(), "loaded environment file");
    }

    let pipeline = match cli.config {
        Some(path) => config::load_from_file(Some(path)),
        None => config::load(),
    }
    .context("failed to load configuration")?;

    commands::run(cli.command, &pipeline).await
}
