//! Analyze every `.sql` file in a folder for one application.
//!
//! Prints a JSON summary of extracted, skipped and failed files on stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use server_core::{kernel::ServerDeps, Settings};
use sql_extraction::{scan_directory, ExtractionResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "scan_folder")]
#[command(about = "Extract data models from a folder of SQL scripts")]
struct Cli {
    /// Folder holding the `.sql` files
    dir: PathBuf,

    /// Application the scripts belong to
    #[arg(long, short)]
    application: String,

    /// Include per-file results in the output
    #[arg(long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Response<'a> {
    application: &'a str,
    extracted: usize,
    skipped: usize,
    failed: usize,
    empty: usize,
    unpersisted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<&'a [ExtractionResult]>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sql_extraction=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let settings = Settings::load().context("Failed to load configuration")?;
    let deps = ServerDeps::from_settings(&settings)
        .await
        .context("Failed to initialize dependencies")?;

    let summary = scan_directory(&deps.extractor, &cli.dir, &cli.application)
        .await
        .with_context(|| format!("Failed to scan {}", cli.dir.display()))?;

    let response = Response {
        application: &cli.application,
        extracted: summary.extracted,
        skipped: summary.skipped,
        failed: summary.failed,
        empty: summary.empty,
        unpersisted: summary.unpersisted,
        results: cli.verbose.then_some(summary.results.as_slice()),
    };
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
