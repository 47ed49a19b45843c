//! Text metrics derived from an article title.
//!
//! All functions here are pure and total: `None`, empty strings and titles
//! with no alphabetic content produce `0` / `0` / an empty list rather than
//! an error. The same functions back both the live pipeline and the
//! at-rest export so the two can never drift apart.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Anything that is not an ASCII letter or a separator. Accented letters are
/// removed too, so `"Él"` becomes `"l"` before the capitalization check.
static NON_ASCII_ALPHA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z\s\x1C-\x1F]").expect("static regex"));

/// Unicode whitespace plus the four ASCII information separators
/// (U+001C to U+001F), which stored titles also treat as word breaks.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_separator).filter(|w| !w.is_empty())
}

/// Number of separator-delimited tokens.
pub fn word_count(title: Option<&str>) -> usize {
    title.map_or(0, |t| words(t).count())
}

/// Number of characters (Unicode scalar values), spaces and punctuation included.
pub fn character_count(title: Option<&str>) -> usize {
    title.map_or(0, |t| t.chars().count())
}

/// Words starting with an uppercase ASCII letter, after stripping every
/// character that is not an ASCII letter or whitespace.
///
/// Order is first-occurrence order in the cleaned title and duplicates are
/// kept.
///
/// ```ignore
/// assert_eq!(capitalized_words(Some("Hola Mundo, 2024!")), vec!["Hola", "Mundo"]);
/// assert_eq!(capitalized_words(Some("café Noticia")), vec!["Noticia"]);
/// ```
pub fn capitalized_words(title: Option<&str>) -> Vec<String> {
    let Some(title) = title else {
        return Vec::new();
    };
    let cleaned = NON_ASCII_ALPHA.replace_all(title, "");
    words(&cleaned)
        .filter(|word| word.chars().next().is_some_and(|c| c.is_ascii_uppercase()))
        .map(str::to_string)
        .collect()
}

/// The three metrics, always computed together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleMetrics {
    pub word_count: usize,
    pub character_count: usize,
    pub capitalized_words: Vec<String>,
}

impl TitleMetrics {
    /// Compute every metric for `title` in one pass over the API.
    pub fn from_title(title: Option<&str>) -> Self {
        Self {
            word_count: word_count(title),
            character_count: character_count(title),
            capitalized_words: capitalized_words(title),
        }
    }

    /// Storage form of [`capitalized_words`](Self::capitalized_words): `"A, B, C"`.
    pub fn capitalized_joined(&self) -> String {
        self.capitalized_words.join(", ")
    }
}
