//! Kicker backfill from article detail pages.
//!
//! Records that left the listing page with [`Kicker::Missing`] are visited
//! one at a time: navigate to the record's link (bounded by a timeout),
//! then poll the fixed kicker path until the element shows up or the settle
//! window runs out. A present element is taken as is, even with empty text. Any failure along the way resolves to [`Kicker::NotFound`];
//! nothing is retried and nothing is propagated to the caller.

use crate::config::BackfillConfig;
use crate::error::SessionError;
use crate::models::{ArticleRecord, Kicker};
use crate::session::RenderingSession;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, instrument, warn};

/// Resolve every missing kicker in `records`, in sequence order.
///
/// Records that already carry a kicker are not visited.
///
/// # Arguments
///
/// * `session` - Session used to load each detail page
/// * `records` - Records as they left the listing page
/// * `config` - Kicker path and the settle/navigation timing
///
/// # Returns
///
/// The same records in the same order, none of them still
/// [`Kicker::Missing`].
#[instrument(level = "info", skip_all, fields(total = records.len()))]
pub async fn backfill_kickers<S: RenderingSession>(
    session: &mut S,
    mut records: Vec<ArticleRecord>,
    config: &BackfillConfig,
) -> Vec<ArticleRecord> {
    let mut found = 0usize;
    let mut not_found = 0usize;

    for record in records.iter_mut().filter(|r| r.kicker.is_missing()) {
        record.kicker = match fetch_kicker(session, &record.link, config).await {
            Ok(kicker) => {
                info!(title = %record.title, %kicker, "Kicker updated");
                found += 1;
                Kicker::Found(kicker)
            }
            Err(e) => {
                warn!(link = %record.link, error = %e, "Kicker not found on detail page");
                not_found += 1;
                Kicker::NotFound
            }
        };
    }

    info!(found, not_found, "Kicker backfill complete");
    records
}

#[instrument(level = "debug", skip(session, config))]
async fn fetch_kicker<S: RenderingSession>(
    session: &mut S,
    link: &str,
    config: &BackfillConfig,
) -> Result<String, SessionError> {
    let limit = config.navigation_timeout();
    timeout(limit, session.navigate(link))
        .await
        .map_err(|_| SessionError::Timeout {
            url: link.to_string(),
            timeout: limit,
        })??;

    wait_for_text(
        session,
        &config.kicker_selector,
        config.settle(),
        config.poll_interval(),
    )
    .await
}

/// Poll `selector` until an element matches or `settle` has elapsed.
///
/// The first lookup happens immediately, so a page that is already
/// complete costs no waiting.
async fn wait_for_text<S: RenderingSession>(
    session: &S,
    selector: &str,
    settle: Duration,
    poll: Duration,
) -> Result<String, SessionError> {
    let deadline = Instant::now() + settle;
    loop {
        let err = match session.locate(selector).await {
            Ok(el) => return Ok(el.text().to_string()),
            Err(e @ SessionError::NoSuchElement { .. }) => e,
            Err(e) => return Err(e),
        };

        let now = Instant::now();
        if now >= deadline {
            return Err(err);
        }
        debug!(error = %err, "Kicker not rendered yet; polling");
        sleep(poll.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KICKER_NOT_FOUND;
    use crate::session::testing::StaticSession;

    fn detail_page(kicker: &str) -> String {
        format!(
            r#"<html><body>
                <div>nav</div><div>ads</div><div>menu</div>
                <div>
                  <div></div><div></div><div></div><div></div>
                  <div><div><div>share</div><div><div>{kicker}</div></div></div></div>
                </div>
            </body></html>"#
        )
    }

    fn fast_config() -> BackfillConfig {
        BackfillConfig {
            settle_ms: 0,
            poll_interval_ms: 1,
            navigation_timeout_ms: 50,
            ..BackfillConfig::default()
        }
    }

    fn record(link: &str, kicker: Kicker) -> ArticleRecord {
        ArticleRecord::new(
            format!("Title for {link}"),
            kicker,
            "https://example.com/i.jpg".to_string(),
            link.to_string(),
        )
    }

    #[tokio::test]
    async fn test_backfills_missing_kicker() {
        let mut session = StaticSession::new()
            .with_page("https://example.com/a", &detail_page("Regulation"));
        let records = vec![record("https://example.com/a", Kicker::Missing)];

        let records = backfill_kickers(&mut session, records, &fast_config()).await;

        assert_eq!(records[0].kicker, Kicker::Found("Regulation".to_string()));
    }

    #[tokio::test]
    async fn test_records_with_kicker_are_not_visited() {
        let mut session = StaticSession::new()
            .with_page("https://example.com/b", &detail_page("Lotteries"));
        let log = session.log();
        let records = vec![
            record("https://example.com/a", Kicker::Found("Casinos".to_string())),
            record("https://example.com/b", Kicker::Missing),
        ];

        let records = backfill_kickers(&mut session, records, &fast_config()).await;

        assert_eq!(log.borrow().navigations, vec!["https://example.com/b"]);
        assert_eq!(records[0].kicker, Kicker::Found("Casinos".to_string()));
        assert_eq!(records[1].kicker, Kicker::Found("Lotteries".to_string()));
    }

    #[tokio::test]
    async fn test_navigation_failure_sets_not_found() {
        let mut session = StaticSession::new();
        let records = vec![record("https://example.com/gone", Kicker::Missing)];

        let records = backfill_kickers(&mut session, records, &fast_config()).await;

        assert_eq!(records[0].kicker, Kicker::NotFound);
        assert_eq!(records[0].kicker.as_stored(), Some(KICKER_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_empty_kicker_element_is_stored_as_found() {
        let mut session = StaticSession::new()
            .with_page("https://example.com/a", &detail_page(""));
        let config = BackfillConfig {
            settle_ms: 200,
            ..fast_config()
        };
        let records = vec![record("https://example.com/a", Kicker::Missing)];

        let started = Instant::now();
        let records = backfill_kickers(&mut session, records, &config).await;

        assert_eq!(records[0].kicker, Kicker::Found(String::new()));
        assert!(started.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_missing_kicker_path_sets_not_found() {
        let mut session = StaticSession::new()
            .with_page("https://example.com/a", "<html><body><p>short</p></body></html>");
        let config = BackfillConfig {
            settle_ms: 20,
            ..fast_config()
        };
        let records = vec![record("https://example.com/a", Kicker::Missing)];

        let records = backfill_kickers(&mut session, records, &config).await;

        assert_eq!(records[0].kicker, Kicker::NotFound);
    }

    #[tokio::test]
    async fn test_navigation_timeout_sets_not_found_and_moves_on() {
        let mut session = StaticSession::new()
            .with_hanging_page("https://example.com/slow")
            .with_page("https://example.com/ok", &detail_page("Esports"));
        let log = session.log();
        let records = vec![
            record("https://example.com/slow", Kicker::Missing),
            record("https://example.com/ok", Kicker::Missing),
        ];

        let records = backfill_kickers(&mut session, records, &fast_config()).await;

        assert_eq!(records[0].kicker, Kicker::NotFound);
        assert_eq!(records[1].kicker, Kicker::Found("Esports".to_string()));
        assert_eq!(
            log.borrow().navigations,
            vec!["https://example.com/slow", "https://example.com/ok"]
        );
    }

    #[tokio::test]
    async fn test_never_leaves_missing_sentinel() {
        let mut session = StaticSession::new()
            .with_page("https://example.com/a", &detail_page("Tech"));
        let records = vec![
            record("https://example.com/a", Kicker::Missing),
            record("https://example.com/b", Kicker::Missing),
            record("https://example.com/c", Kicker::Missing),
        ];

        let records = backfill_kickers(&mut session, records, &fast_config()).await;

        assert!(records.iter().all(|r| !r.kicker.is_missing()));
        assert_eq!(records.len(), 3);
    }
}
