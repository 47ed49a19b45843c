//! Pipeline orchestration.
//!
//! One run moves strictly forward through
//!
//! ```text
//! Init → Extracted → Backfilled → Enriched → Uploaded → Closed
//! ```
//!
//! with `Failed` reachable from any non-terminal state when the session
//! cannot be acquired, the listing page cannot be loaded, or the warehouse
//! client cannot be built. The rendering session is acquired before
//! extraction and released right after backfill on every path, so it is
//! never held during upload. An upload failure is reported in the
//! [`PipelineReport`] and the run still closes with the enriched records
//! in hand.

use crate::config::{PipelineConfig, WarehouseConfig};
use crate::error::{PipelineError, SessionError, UploadError};
use crate::models::{ArticleRecord, WarehouseRow};
use crate::postprocess::enrich;
use crate::scrapers::{kicker::backfill_kickers, listing::extract_listing};
use crate::session::RenderingSession;
use crate::warehouse::{AppendOutcome, TableId, Warehouse};
use std::future::Future;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Extracted,
    Backfilled,
    Enriched,
    Uploaded,
    Closed,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Closed | PipelineState::Failed)
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_advance_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Failed) => true,
            (Init, Extracted)
            | (Extracted, Backfilled)
            | (Backfilled, Enriched)
            | (Enriched, Uploaded)
            | (Enriched, Closed)
            | (Uploaded, Closed) => true,
            _ => false,
        }
    }
}

/// Everything a caller gets back from a run.
///
/// `records` holds whatever the run produced, so a failed or skipped upload
/// still leaves the enriched records available for local persistence.
#[derive(Debug)]
pub struct PipelineReport {
    pub state: PipelineState,
    pub records: Vec<ArticleRecord>,
    pub upload: Option<AppendOutcome>,
    pub error: Option<PipelineError>,
}

/// A single run of extract → backfill → enrich → upload.
#[derive(Debug)]
pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    skip_upload: bool,
    state: PipelineState,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            skip_upload: false,
            state: PipelineState::Init,
        }
    }

    /// Stop after enrichment without constructing a warehouse client.
    pub fn skip_upload(mut self, skip: bool) -> Self {
        self.skip_upload = skip;
        self
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        info!(from = ?self.state, to = ?next, "Pipeline state transition");
        self.state = next;
    }

    fn finish(
        mut self,
        records: Vec<ArticleRecord>,
        upload: Option<AppendOutcome>,
        error: Option<PipelineError>,
    ) -> PipelineReport {
        if !self.state.is_terminal() {
            self.advance(PipelineState::Closed);
        }
        PipelineReport {
            state: self.state,
            records,
            upload,
            error,
        }
    }

    fn fail(mut self, records: Vec<ArticleRecord>, err: PipelineError) -> PipelineReport {
        error!(error = %err, state = ?self.state, "Pipeline failed");
        self.advance(PipelineState::Failed);
        self.finish(records, None, Some(err))
    }

    /// Run the pipeline once.
    ///
    /// # Arguments
    ///
    /// * `acquire` - Yields the rendering session; awaited only once the run starts
    /// * `connect` - Builds the warehouse client after enrichment
    ///
    /// # Returns
    ///
    /// A [`PipelineReport`] in a terminal state. Failures are carried in the
    /// report rather than returned, and the session is closed on every path
    /// that acquired one.
    #[instrument(level = "info", skip_all, fields(listing = %self.config.listing.url))]
    pub async fn run<S, A, W, C>(mut self, acquire: A, connect: C) -> PipelineReport
    where
        S: RenderingSession,
        A: Future<Output = Result<S, SessionError>>,
        W: Warehouse,
        C: FnOnce(&WarehouseConfig) -> Result<W, UploadError>,
    {
        let mut session = match acquire.await {
            Ok(session) => session,
            Err(e) => return self.fail(Vec::new(), PipelineError::SessionAcquire(e)),
        };

        let scraped = self.scrape(&mut session).await;
        if let Err(e) = session.close().await {
            warn!(error = %e, "Session did not close cleanly");
        }
        info!("Rendering session released");

        let records = match scraped {
            Ok(records) => records,
            Err(e) => return self.fail(Vec::new(), PipelineError::ListingFetch(e)),
        };

        let records = enrich(records);
        self.advance(PipelineState::Enriched);

        if self.skip_upload {
            info!(count = records.len(), "Upload skipped");
            return self.finish(records, None, None);
        }

        let config = self.config;
        let warehouse_config = &config.warehouse;
        let prepared = warehouse_config
            .table
            .parse::<TableId>()
            .and_then(|table| connect(warehouse_config).map(|w| (table, w)));
        let (table, warehouse) = match prepared {
            Ok(pair) => pair,
            Err(e) => return self.fail(records, PipelineError::WarehouseConnect(e)),
        };

        let rows: Vec<WarehouseRow> = records.iter().map(WarehouseRow::from).collect();
        match warehouse.append(&table, &rows).await {
            Ok(outcome) => {
                info!(table = %outcome.table, rows = outcome.rows, "Upload complete");
                self.advance(PipelineState::Uploaded);
                self.finish(records, Some(outcome), None)
            }
            Err(e) => {
                error!(%table, error = %e, "Upload failed; enriched records kept in memory");
                self.finish(records, None, Some(PipelineError::Upload(e)))
            }
        }
    }

    async fn scrape<S: RenderingSession>(
        &mut self,
        session: &mut S,
    ) -> Result<Vec<ArticleRecord>, SessionError> {
        let records = extract_listing(session, &self.config.listing).await?;
        self.advance(PipelineState::Extracted);

        let records = backfill_kickers(session, records, &self.config.backfill).await;
        self.advance(PipelineState::Backfilled);
        Ok(records)
    }
}
