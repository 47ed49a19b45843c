//! Pipeline configuration.
//!
//! Everything site- or platform-specific lives here: the listing URL, the
//! structural selectors, backfill timing, HTTP client settings and warehouse
//! credentials. Values come from an optional YAML file; every section and
//! field falls back to a default, and CLI flags override the file.
//!
//! ```yaml
//! listing:
//!   url: https://www.yogonet.com/international/
//! backfill:
//!   settle_ms: 1500
//! warehouse:
//!   table: my-project.scraping_dataset.noticias
//!   access_token_file: /app/bigquery_token
//! ```

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub listing: ListingConfig,
    pub backfill: BackfillConfig,
    pub session: SessionConfig,
    pub warehouse: WarehouseConfig,
}

/// Where the listing page lives and how its article blocks are shaped.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub url: String,
    pub article_block: String,
    pub kicker: String,
    pub title: String,
    pub image: String,
    pub link: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            url: "https://www.yogonet.com/international/".to_string(),
            article_block: ".contenedor_dato_modulo".to_string(),
            kicker: ".volanta.fuente_roboto_slab".to_string(),
            title: ".titulo.fuente_roboto_slab".to_string(),
            image: ".imagen img".to_string(),
            link: ".titulo.fuente_roboto_slab a".to_string(),
        }
    }
}

/// Detail-page kicker lookup and its timing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackfillConfig {
    /// Fixed structural path of the kicker on a detail page.
    pub kicker_selector: String,
    /// How long to keep polling for the kicker after navigation.
    pub settle_ms: u64,
    pub poll_interval_ms: u64,
    /// Upper bound on a single navigation.
    pub navigation_timeout_ms: u64,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            // /html/body/div[4]/div[5]/div/div[2]/div
            kicker_selector:
                "body > div:nth-of-type(4) > div:nth-of-type(5) > div > div:nth-of-type(2) > div"
                    .to_string(),
            settle_ms: 2_000,
            poll_interval_ms: 250,
            navigation_timeout_ms: 15_000,
        }
    }
}

impl BackfillConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("kicker_scrape/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// `project.dataset.table`
    pub table: String,
    pub endpoint: String,
    pub access_token: Option<String>,
    pub access_token_file: Option<PathBuf>,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            table: "mi-proyecto-cloudrun.scraping_dataset.noticias".to_string(),
            endpoint: "https://bigquery.googleapis.com/bigquery/v2".to_string(),
            access_token: None,
            access_token_file: None,
        }
    }
}

impl PipelineConfig {
    /// Load the configuration from `path`, or the defaults when `path` is `None`.
    #[instrument(level = "info")]
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            info!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&text).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), listing = %config.listing.url, "Loaded configuration");
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes to `null`, which should mean "all defaults".
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}
