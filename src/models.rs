//! Data models for scraped articles and their warehouse projection.
//!
//! - [`ArticleRecord`]: one article, mutated in place as it moves through the pipeline
//! - [`Kicker`]: the kicker field with its two sentinel states
//! - [`WarehouseRow`]: the flat row appended to the warehouse table

use crate::metrics::TitleMetrics;
use serde::{Serialize, Serializer};

/// Stored in place of a kicker that could not be found on the detail page.
pub const KICKER_NOT_FOUND: &str = "Kicker no encontrado";

/// The kicker of an article.
///
/// The field is never absent: it is either a real value or one of the two
/// markers that tell "not looked up yet" apart from "looked up and missing".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Kicker {
    /// Not present on the listing page; a backfill is still owed.
    #[default]
    Missing,
    /// Backfill was attempted and failed.
    NotFound,
    Found(String),
}

impl Kicker {
    pub fn is_missing(&self) -> bool {
        matches!(self, Kicker::Missing)
    }

    /// Storage value: the text, the not-found marker, or `None` while missing.
    pub fn as_stored(&self) -> Option<&str> {
        match self {
            Kicker::Missing => None,
            Kicker::NotFound => Some(KICKER_NOT_FOUND),
            Kicker::Found(text) => Some(text),
        }
    }
}

impl Serialize for Kicker {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_stored().serialize(serializer)
    }
}

/// A single article as it moves through extraction, backfill and enrichment.
///
/// Identity is [`link`](Self::link). `metrics` is `None` until
/// post-processing, and then carries all three metrics at once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArticleRecord {
    pub title: String,
    pub kicker: Kicker,
    pub image_url: String,
    pub link: String,
    #[serde(flatten)]
    pub metrics: Option<TitleMetrics>,
}

impl ArticleRecord {
    pub fn new(title: String, kicker: Kicker, image_url: String, link: String) -> Self {
        Self {
            title,
            kicker,
            image_url,
            link,
            metrics: None,
        }
    }
}

/// The row layout of the warehouse table.
///
/// Column names match the existing `noticias` table, and the same
/// metric column names are used by the at-rest export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WarehouseRow {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Kicker")]
    pub kicker: Option<String>,
    #[serde(rename = "Image")]
    pub image: String,
    #[serde(rename = "Link")]
    pub link: String,
    #[serde(rename = "Word_Count")]
    pub word_count: Option<usize>,
    #[serde(rename = "Character_Count")]
    pub character_count: Option<usize>,
    #[serde(rename = "Capitalized_Words")]
    pub capitalized_words: Option<String>,
}

impl From<&ArticleRecord> for WarehouseRow {
    fn from(record: &ArticleRecord) -> Self {
        let metrics = record.metrics.as_ref();
        Self {
            title: record.title.clone(),
            kicker: record.kicker.as_stored().map(str::to_string),
            image: record.image_url.clone(),
            link: record.link.clone(),
            word_count: metrics.map(|m| m.word_count),
            character_count: metrics.map(|m| m.character_count),
            capitalized_words: metrics.map(TitleMetrics::capitalized_joined),
        }
    }
}
