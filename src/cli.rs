//! Command-line interface definitions.
//!
//! Two subcommands: `run` drives the live pipeline, `export` re-exports an
//! at-rest table with title metrics. Credentials and the target table can
//! also come from environment variables.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Scrape a news listing, backfill kickers, derive title metrics and append
/// the rows to a warehouse table.
///
/// # Examples
///
/// ```sh
/// # Live run, uploading to the default table
/// BIGQUERY_ACCESS_TOKEN=... kicker_scrape run
///
/// # Live run with a config file and a local JSON snapshot, no upload
/// kicker_scrape run --config pipeline.yaml --json-output-dir ./out --skip-upload
///
/// # Re-export a stored table with metrics
/// kicker_scrape export --input noticias.xlsx --output Noticias_Procesadas.xlsx
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the live scrape → backfill → enrich → upload pipeline
    Run(RunArgs),
    /// Append title metrics to a stored CSV or XLSX table, writing a new file
    Export(ExportArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Optional path to a YAML pipeline configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Warehouse table as project.dataset.table
    #[arg(long, env = "WAREHOUSE_TABLE")]
    pub table: Option<String>,

    /// Warehouse access token
    #[arg(long, env = "BIGQUERY_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// File containing the warehouse access token
    #[arg(long, env = "BIGQUERY_ACCESS_TOKEN_FILE")]
    pub access_token_file: Option<PathBuf>,

    /// Directory for a local JSON snapshot of the enriched records
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Stop after enrichment; do not contact the warehouse
    #[arg(long)]
    pub skip_upload: bool,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Stored table (.csv or .xlsx) with a Title column
    #[arg(short, long)]
    pub input: PathBuf,

    /// Where to write the processed table (.csv or .xlsx)
    #[arg(short, long)]
    pub output: PathBuf,
}
