//! Title metrics enrichment.

use crate::metrics::TitleMetrics;
use crate::models::ArticleRecord;
use tracing::{info, instrument};

/// Attach [`TitleMetrics`] to every record. Pure; recomputes from `title`
/// each time, so running it twice gives the same result.
#[instrument(level = "info", skip_all, fields(count = records.len()))]
pub fn enrich(mut records: Vec<ArticleRecord>) -> Vec<ArticleRecord> {
    for record in &mut records {
        record.metrics = Some(TitleMetrics::from_title(Some(&record.title)));
    }
    info!("Post-processing complete");
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Kicker;

    fn records() -> Vec<ArticleRecord> {
        ["Hola Mundo, 2024!", "café Noticia", ""]
            .into_iter()
            .map(|t| {
                ArticleRecord::new(
                    t.to_string(),
                    Kicker::NotFound,
                    "https://example.com/i.jpg".to_string(),
                    format!("https://example.com/{}", t.len()),
                )
            })
            .collect()
    }

    #[test]
    fn test_enrich_attaches_all_metrics() {
        let enriched = enrich(records());
        let m = enriched[0].metrics.as_ref().unwrap();
        assert_eq!(m.word_count, 3);
        assert_eq!(m.character_count, 17);
        assert_eq!(m.capitalized_joined(), "Hola, Mundo");

        let m = enriched[1].metrics.as_ref().unwrap();
        assert_eq!(m.capitalized_words, vec!["Noticia"]);

        let m = enriched[2].metrics.as_ref().unwrap();
        assert_eq!((m.word_count, m.character_count), (0, 0));
        assert!(m.capitalized_words.is_empty());
    }

    #[test]
    fn test_enrich_is_idempotent() {
        let once = enrich(records());
        let twice = enrich(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_enrich_leaves_other_fields_alone() {
        let before = records();
        let after = enrich(before.clone());
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(b.title, a.title);
            assert_eq!(b.kicker, a.kicker);
            assert_eq!(b.link, a.link);
        }
    }
}
