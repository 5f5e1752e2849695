//! The per-source extraction contract.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use pressroom_common::{FetchClient, Result};

/// Placeholder when a page exposes no usable title.
pub const DEFAULT_TITLE: &str = "untitled";
/// Placeholder when a page exposes no usable author.
pub const DEFAULT_AUTHOR: &str = "unknown";

/// Transient metadata pulled from one fetched page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedMetadata {
    pub title: String,
    pub author: String,
    pub date: NaiveDate,
    pub category: String,
    pub url: String,
}

/// A candidate body: the markup of the selected region plus its visible
/// text, the latter used for sufficiency checks and filename slugs.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyRegion {
    pub html: String,
    pub text: String,
}

/// Everything one `scrape` call produced for a URL.
#[derive(Debug, Clone)]
pub struct ScrapedDocument {
    pub meta: ExtractedMetadata,
    /// The full fetched page, archived as the primary body file.
    pub page_html: String,
    pub body: Option<BodyRegion>,
    /// Secondary-language body, when the source produced one.
    pub body_zh: Option<BodyRegion>,
    /// Secondary-language title, when the source produced one.
    pub title_zh: Option<String>,
}

/// One supported publication.
///
/// `extract_metadata` never fails: missing fields degrade to
/// [`DEFAULT_TITLE`] / [`DEFAULT_AUTHOR`] / today's date so a partially
/// broken page still yields a record. `extract_body` returns `None` when no
/// region passes the sufficiency check, which callers treat as an
/// extraction failure.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Whether this extractor handles the given URL.
    fn claims(&self, url: &str) -> bool;

    fn source_name(&self) -> &'static str;

    fn source_slug(&self) -> &'static str;

    fn extract_category(&self, url: &str, html: &str) -> String;

    fn extract_metadata(&self, url: &str, html: &str) -> ExtractedMetadata;

    fn extract_body(&self, html: &str) -> Option<BodyRegion>;

    /// Fetch the URL and run the extraction chain. Sources with media
    /// processing (podcast transcription) override this.
    async fn scrape(&self, client: &FetchClient, url: &str) -> Result<ScrapedDocument> {
        let page_html = client.get_text(url).await?;
        let meta = self.extract_metadata(url, &page_html);
        let body = self.extract_body(&page_html);
        Ok(ScrapedDocument {
            meta,
            page_html,
            body,
            body_zh: None,
            title_zh: None,
        })
    }
}
