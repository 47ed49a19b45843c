//! Local output paths for enriched records.
//!
//! # Submodules
//!
//! - [`json`]: writes a JSON snapshot of a live run, kept even if the upload fails
//! - [`export`]: re-exports an at-rest CSV table with title metrics appended
//!
//! Both share [`crate::metrics`] with the live pipeline and use the same
//! metric column names as the warehouse table.

pub mod export;
pub mod json;
