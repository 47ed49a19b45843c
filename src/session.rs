//! The page-rendering session the scrapers drive.
//!
//! [`RenderingSession`] is the seam between the pipeline and whatever loads
//! pages: navigate to a URL, then locate elements in the loaded document by
//! CSS selector. Every call is fallible; callers decide per call whether a
//! failure drops a record, sets a sentinel or aborts.
//!
//! [`HttpSession`] is the production implementation: a `reqwest` client
//! that fetches each page and parses it with `scraper`. Located elements are
//! returned as owned [`Element`] snapshots so no borrow of the document
//! outlives the next navigation.

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::utils::truncate_for_log;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use url::Url;

/// A controllable page-loading session. One navigation at a time.
pub trait RenderingSession {
    /// Load `url`, replacing the current document.
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// URL of the currently loaded document, after redirects.
    fn current_url(&self) -> Option<&Url>;

    /// Every element of the current document matching `selector`, in document order.
    async fn locate_all(&self, selector: &str) -> Result<Vec<Element>, SessionError>;

    /// First element matching `selector`.
    async fn locate(&self, selector: &str) -> Result<Element, SessionError> {
        self.locate_all(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::NoSuchElement {
                selector: selector.to_string(),
            })
    }

    /// Release the session. Further calls are not expected to succeed.
    async fn close(&mut self) -> Result<(), SessionError>;
}

/// Owned snapshot of a located element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    outer_html: String,
    text: String,
    attributes: Vec<(String, String)>,
}

impl Element {
    fn from_ref(element: ElementRef<'_>) -> Self {
        Self {
            outer_html: element.html(),
            text: collapse_whitespace(element.text()),
            attributes: element
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Rendered text: all descendant text with whitespace runs collapsed and trimmed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attribute(&self, name: &str) -> Result<&str, SessionError> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .ok_or_else(|| SessionError::MissingAttribute {
                name: name.to_string(),
            })
    }

    /// Descendants of this element matching `selector`, in document order.
    pub fn locate_all(&self, selector: &str) -> Result<Vec<Element>, SessionError> {
        let selector = parse_selector(selector)?;
        let fragment = Html::parse_fragment(&self.outer_html);
        // The fragment root is a synthetic <html>; its first element child is us.
        let Some(this) = fragment
            .root_element()
            .children()
            .find_map(ElementRef::wrap)
        else {
            return Ok(Vec::new());
        };
        Ok(this.select(&selector).map(Element::from_ref).collect())
    }

    /// First descendant matching `selector`.
    pub fn locate(&self, selector: &str) -> Result<Element, SessionError> {
        self.locate_all(selector)?
            .into_iter()
            .next()
            .ok_or_else(|| SessionError::NoSuchElement {
                selector: selector.to_string(),
            })
    }
}

/// A parsed page together with the URL it was served from.
#[derive(Debug)]
pub struct Document {
    url: Url,
    html: Html,
}

impl Document {
    pub fn parse(url: Url, body: &str) -> Self {
        Self {
            url,
            html: Html::parse_document(body),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn select(&self, selector: &str) -> Result<Vec<Element>, SessionError> {
        let selector = parse_selector(selector)?;
        Ok(self.html.select(&selector).map(Element::from_ref).collect())
    }
}

/// Resolve an `href`/`src` value against the page it came from.
pub fn resolve_against(base: &Url, value: &str) -> Result<String, SessionError> {
    base.join(value)
        .map(String::from)
        .map_err(|source| SessionError::BadUrl {
            value: value.to_string(),
            base: base.to_string(),
            source,
        })
}

fn parse_selector(selector: &str) -> Result<Selector, SessionError> {
    Selector::parse(selector).map_err(|e| SessionError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

fn collapse_whitespace<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Session backed by plain HTTP fetches.
#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    document: Option<Document>,
}

impl HttpSession {
    /// Build the HTTP client.
    ///
    /// # Arguments
    ///
    /// * `config` - User agent and per-request timeout
    ///
    /// # Returns
    ///
    /// A session with no document loaded yet.
    ///
    /// # Errors
    ///
    /// Fails when the client cannot be built; the pipeline treats this as a
    /// session acquisition failure.
    #[instrument(level = "info", skip_all, fields(user_agent = %config.user_agent))]
    pub fn open(config: &SessionConfig) -> Result<Self, SessionError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        info!("HTTP session opened");
        Ok(Self {
            client,
            document: None,
        })
    }

    fn document(&self) -> Result<&Document, SessionError> {
        self.document.as_ref().ok_or(SessionError::NoDocument)
    }
}

impl RenderingSession for HttpSession {
    #[instrument(level = "info", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError> {
        let t0 = Instant::now();
        // Drop the old page first so a failed navigation never leaves it looking current.
        self.document = None;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %truncate_for_log(&body, 200), "Non-success response");
            return Err(SessionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let final_url = response.url().clone();
        let body = response.text().await?;

        debug!(
            bytes = body.len(),
            %final_url,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        self.document = Some(Document::parse(final_url, &body));
        Ok(())
    }

    fn current_url(&self) -> Option<&Url> {
        self.document.as_ref().map(Document::url)
    }

    async fn locate_all(&self, selector: &str) -> Result<Vec<Element>, SessionError> {
        self.document()?.select(selector)
    }

    #[instrument(level = "info", skip_all)]
    async fn close(&mut self) -> Result<(), SessionError> {
        self.document = None;
        info!("HTTP session closed");
        Ok(())
    }
}
