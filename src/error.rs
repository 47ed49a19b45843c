//! Error types for every stage of the pipeline.
//!
//! Each collaborator gets its own enum so the pipeline can decide, per
//! variant family, whether a failure drops a record, sets a sentinel, or
//! aborts the run.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures raised by a [`RenderingSession`](crate::session::RenderingSession).
#[derive(Error, Debug)]
pub enum SessionError {
    /// The HTTP client could not be built or the request failed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered, but not with a 2xx status.
    #[error("expected a 2xx response from {url} but got {status}")]
    Status { url: String, status: u16 },
    /// Navigation did not finish inside the configured window.
    #[error("navigation to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },
    /// The selector text is not valid CSS.
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
    /// Nothing matched the selector.
    #[error("no element matches `{selector}`")]
    NoSuchElement { selector: String },
    /// The element exists but does not carry the attribute.
    #[error("element has no `{name}` attribute")]
    MissingAttribute { name: String },
    /// A lookup was attempted before any page was loaded.
    #[error("no document loaded")]
    NoDocument,
    /// The attribute value could not be resolved to an absolute URL.
    #[error("cannot resolve `{value}` against {base}: {source}")]
    BadUrl {
        value: String,
        base: String,
        #[source]
        source: url::ParseError,
    },
}

/// Failures raised while constructing or calling the warehouse client.
#[derive(Error, Debug)]
pub enum UploadError {
    /// Neither an access token nor a token file was configured.
    #[error("no warehouse credentials configured")]
    MissingCredentials,
    /// The configured token file does not exist or cannot be read.
    #[error("credentials file {path} not readable: {source}")]
    CredentialsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The table id is not of the form `project.dataset.table`.
    #[error("invalid table id `{0}` (expected project.dataset.table)")]
    InvalidTableId(String),
    #[error("warehouse request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("warehouse answered {status}: {body}")]
    Status { status: u16, body: String },
    /// The request went through but some rows were refused.
    #[error("warehouse rejected {rejected} row(s): {first}")]
    Rejected { rejected: usize, first: String },
}

/// Failures of the at-rest tabular export.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("input table {0} does not exist")]
    MissingInput(PathBuf),
    #[error("refusing to overwrite the input table {0}")]
    SameFile(PathBuf),
    #[error("input table has no `{0}` column")]
    MissingColumn(&'static str),
    /// Only `.csv` and `.xlsx` tables are read and written.
    #[error("unsupported table format for {0} (expected .csv or .xlsx)")]
    UnsupportedFormat(PathBuf),
    #[error("workbook {0} has no worksheet")]
    NoWorksheet(PathBuf),
    /// Row or column index past what a worksheet can hold.
    #[error("table too large for a worksheet at row {row}, column {col}")]
    OutOfRange { row: usize, col: usize },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("cannot read workbook: {0}")]
    XlsxRead(#[from] calamine::Error),
    #[error("cannot write workbook: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failures loading the YAML configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Run-level failures surfaced by the orchestrator.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("could not acquire rendering session: {0}")]
    SessionAcquire(#[source] SessionError),
    #[error("could not load the listing page: {0}")]
    ListingFetch(#[source] SessionError),
    #[error("could not construct warehouse client: {0}")]
    WarehouseConnect(#[source] UploadError),
    #[error("upload failed: {0}")]
    Upload(#[source] UploadError),
}
