//! Local JSON snapshot of the enriched records.
//!
//! Written independently of the warehouse upload so the records survive a
//! failed append.
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── 081502.json
//!     └── 201944.json
//! ```

use crate::models::ArticleRecord;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

#[derive(Debug, Serialize)]
struct Snapshot<'a> {
    scraped_at: String,
    count: usize,
    records: &'a [ArticleRecord],
}

/// Path of the snapshot for a run that started at `at`.
pub fn snapshot_path(json_output_dir: &str, at: DateTime<Local>) -> PathBuf {
    PathBuf::from(json_output_dir)
        .join(at.format("%Y-%m-%d").to_string())
        .join(format!("{}.json", at.format("%H%M%S")))
}

/// Write `records` to `{json_output_dir}/{date}/{HHMMSS}.json`.
///
/// # Returns
///
/// The path written, or an error if directory creation or the write fails.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, count = records.len()))]
pub async fn write_records(
    records: &[ArticleRecord],
    json_output_dir: &str,
    at: DateTime<Local>,
) -> Result<PathBuf, Box<dyn Error>> {
    let path = snapshot_path(json_output_dir, at);
    let snapshot = Snapshot {
        scraped_at: at.to_rfc3339(),
        count: records.len(),
        records,
    };
    let json = serde_json::to_string_pretty(&snapshot)?;

    if let Some(dir) = path.parent() {
        if let Err(e) = fs::create_dir_all(dir).await {
            error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
            return Err(e.into());
        }
    }

    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON snapshot");
    Ok(path)
}
