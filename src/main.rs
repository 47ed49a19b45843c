//! # Kicker Scrape
//!
//! Scrapes the article listing of a news aggregator, repairs kickers that
//! are missing from the listing by visiting each article's detail page,
//! derives word/character/capitalized-word metrics from every title, and
//! appends the enriched rows to a warehouse table.
//!
//! ## Usage
//!
//! ```sh
//! kicker_scrape run --config pipeline.yaml --json-output-dir ./json
//! kicker_scrape export --input noticias.csv --output noticias_procesadas.csv
//! ```
//!
//! ## Architecture
//!
//! A run is strictly sequential:
//! 1. **Extraction**: read every article block of the listing page
//! 2. **Backfill**: visit detail pages for records without a kicker
//! 3. **Post-processing**: attach title metrics
//! 4. **Upload**: append the rows to the warehouse (append-only, no dedup)

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod error;
mod metrics;
mod models;
mod outputs;
mod pipeline;
mod postprocess;
mod scrapers;
mod session;
mod utils;
mod warehouse;

use cli::{Cli, Command, ExportArgs, RunArgs};
use config::PipelineConfig;
use outputs::{export, json};
use pipeline::{Pipeline, PipelineState};
use session::HttpSession;
use utils::ensure_writable_dir;
use warehouse::BigQueryClient;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();

    match args.command {
        Command::Run(run_args) => run(run_args).await,
        Command::Export(export_args) => run_export(export_args),
    }
}

async fn run(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();
    let started_at = Local::now();
    info!(version = env!("CARGO_PKG_VERSION"), "kicker_scrape starting up");

    let mut config = PipelineConfig::load(args.config.as_deref())?;
    if let Some(table) = args.table {
        config.warehouse.table = table;
    }
    if let Some(token) = args.access_token {
        config.warehouse.access_token = Some(token);
    }
    if let Some(path) = args.access_token_file {
        config.warehouse.access_token_file = Some(path);
    }

    // Early check, before any network work
    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir, error = %e, "JSON output directory is not writable");
            return Err(e);
        }
    }

    let report = Pipeline::new(&config)
        .skip_upload(args.skip_upload)
        .run(
            async { HttpSession::open(&config.session) },
            BigQueryClient::connect,
        )
        .await;

    if let Some(dir) = &args.json_output_dir {
        if report.records.is_empty() {
            warn!("No records to persist locally");
        } else if let Err(e) = json::write_records(&report.records, dir, started_at).await {
            error!(error = %e, "Failed to write JSON snapshot");
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        state = ?report.state,
        records = report.records.len(),
        uploaded = report.upload.as_ref().map_or(0, |o| o.rows),
        "Execution complete"
    );

    match report.error {
        Some(e) if report.state == PipelineState::Failed => Err(e.into()),
        Some(e) => {
            // Upload failures are reported, not fatal
            error!(error = %e, "Run finished with errors");
            Ok(())
        }
        None => Ok(()),
    }
}

fn run_export(args: ExportArgs) -> Result<(), Box<dyn Error>> {
    let summary = export::export_with_metrics(&args.input, &args.output)?;
    info!(
        rows = summary.rows,
        output = %args.output.display(),
        "Processed table written"
    );
    Ok(())
}
