//! Listing page extraction.
//!
//! The listing page is fetched once and every article block is read
//! independently. Each field lookup yields a value or an error on its own;
//! the record is then assembled with an explicit rule:
//!
//! - kicker element absent: keep the record, mark the kicker [`Kicker::Missing`]
//! - kicker element present: keep its text as found, even when empty
//! - title, image or link missing: drop the block, log it, move on
//!
//! Output order is document order. Nothing is retried here.

use crate::config::ListingConfig;
use crate::error::SessionError;
use crate::models::{ArticleRecord, Kicker};
use crate::session::{resolve_against, Element, RenderingSession};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Field lookups for one article block, before the keep/drop decision.
#[derive(Debug)]
struct BlockFields {
    kicker: Option<String>,
    title: Result<String, SessionError>,
    image_url: Result<String, SessionError>,
    link: Result<String, SessionError>,
}

impl BlockFields {
    fn read(block: &Element, base: &Url, config: &ListingConfig) -> Self {
        let kicker = match block.locate(&config.kicker) {
            Ok(el) => Some(el.text().to_string()),
            Err(e) => {
                debug!(error = %e, "No kicker on listing block");
                None
            }
        };
        let title = block.locate(&config.title).map(|el| el.text().to_string());
        let image_url = block
            .locate(&config.image)
            .and_then(|el| resolve_against(base, el.attribute("src")?));
        let link = block
            .locate(&config.link)
            .and_then(|el| resolve_against(base, el.attribute("href")?));

        Self {
            kicker,
            title,
            image_url,
            link,
        }
    }

    /// Require title, image and link; the kicker may still be owed.
    fn into_record(self) -> Result<ArticleRecord, SessionError> {
        let title = self.title?;
        let image_url = self.image_url?;
        let link = self.link?;
        let kicker = self.kicker.map_or(Kicker::Missing, Kicker::Found);
        Ok(ArticleRecord::new(title, kicker, image_url, link))
    }
}

/// Fetch the listing page and turn each article block into a record.
///
/// # Arguments
///
/// * `session` - Session used to load the listing page
/// * `config` - Listing URL and the per-field selectors
///
/// # Returns
///
/// The records in document order, without metrics. Records whose block had
/// no kicker element carry [`Kicker::Missing`].
///
/// # Errors
///
/// Only page-level failures are returned: the listing page cannot be loaded
/// or the block selector itself is unusable. Per-block failures are logged
/// and the block is skipped.
#[instrument(level = "info", skip_all, fields(url = %config.url))]
pub async fn extract_listing<S: RenderingSession>(
    session: &mut S,
    config: &ListingConfig,
) -> Result<Vec<ArticleRecord>, SessionError> {
    session.navigate(&config.url).await?;
    let base = session
        .current_url()
        .cloned()
        .ok_or(SessionError::NoDocument)?;

    let blocks = session.locate_all(&config.article_block).await?;
    info!(count = blocks.len(), "Found article blocks");

    let mut records = Vec::with_capacity(blocks.len());
    for (index, block) in blocks.iter().enumerate() {
        match BlockFields::read(block, &base, config).into_record() {
            Ok(record) => {
                debug!(index, title = %record.title, missing_kicker = record.kicker.is_missing(), "Extracted article");
                records.push(record);
            }
            Err(e) => warn!(index, error = %e, "Could not extract article block; skipping"),
        }
    }

    let missing = records.iter().filter(|r| r.kicker.is_missing()).count();
    info!(
        extracted = records.len(),
        dropped = blocks.len() - records.len(),
        missing_kickers = missing,
        "Listing extraction complete"
    );
    Ok(records)
}
