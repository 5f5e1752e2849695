//! The New Yorker (`newyorker.com`).
//!
//! Heavily paywalled: the DOM body is usually a teaser, so the fallback
//! chain leans on the JSON-LD `articleBody`. The category comes from the
//! section segment of the URL path.

use std::sync::Arc;

use chrono::Utc;
use scraper::Html;
use serde_json::Value;
use url::Url;

use pressroom_common::{category_from_url, FetchClient, Result};

use crate::dom;
use crate::extractor::{
    BodyRegion, ExtractedMetadata, Extractor, ScrapedDocument, DEFAULT_AUTHOR, DEFAULT_TITLE,
};
use crate::textgen::{self, TextService};

const SOURCE_NAME: &str = "The New Yorker";
const NON_AUTHORS: &[&str] = &["the new yorker", "new yorker", "condé nast"];
const BODY_SELECTORS: &[&str] = &[
    r#"div[class*="body__inner-container"]"#,
    r#"div[class*="article__body"]"#,
    "article",
    "main",
];

pub struct NewYorkerExtractor {
    text_service: Option<Arc<dyn TextService>>,
}

impl NewYorkerExtractor {
    pub fn new(text_service: Option<Arc<dyn TextService>>) -> Self {
        Self { text_service }
    }

    fn article_block(doc: &Html) -> Option<Value> {
        dom::json_ld_of_type(doc, "NewsArticle").or_else(|| dom::json_ld_of_type(doc, "Article"))
    }

    fn title(&self, doc: &Html) -> String {
        Self::article_block(doc)
            .and_then(|a| {
                a.get("headline")
                    .and_then(Value::as_str)
                    .map(|h| h.trim().to_string())
            })
            .filter(|t| !t.is_empty())
            .or_else(|| dom::meta_property(doc, "og:title"))
            .or_else(|| dom::first_heading(doc))
            .or_else(|| dom::page_title(doc).map(|t| dom::strip_title_suffix(&t)))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }

    fn author(&self, doc: &Html) -> String {
        Self::article_block(doc)
            .as_ref()
            .and_then(dom::json_ld_author)
            .and_then(|a| dom::clean_author(&a, NON_AUTHORS))
            .or_else(|| {
                dom::meta_property(doc, "article:author")
                    .or_else(|| dom::meta_name(doc, "author"))
                    .and_then(|a| dom::clean_author(&a, NON_AUTHORS))
            })
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string())
    }

    fn date(&self, doc: &Html) -> Option<chrono::NaiveDate> {
        Self::article_block(doc)
            .and_then(|a| {
                a.get("datePublished")
                    .and_then(Value::as_str)
                    .and_then(dom::parse_iso_date)
            })
            .or_else(|| {
                dom::meta_property(doc, "article:published_time")
                    .and_then(|d| dom::parse_iso_date(&d))
            })
    }
}

#[async_trait::async_trait]
impl Extractor for NewYorkerExtractor {
    fn claims(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|u| matches!(u.host_str(), Some("newyorker.com" | "www.newyorker.com")))
            .unwrap_or(false)
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn source_slug(&self) -> &'static str {
        "newyorker"
    }

    fn extract_category(&self, url: &str, _html: &str) -> String {
        category_from_url(url, SOURCE_NAME)
    }

    fn extract_metadata(&self, url: &str, html: &str) -> ExtractedMetadata {
        let doc = dom::parse_document(html);
        ExtractedMetadata {
            title: self.title(&doc),
            author: self.author(&doc),
            date: self.date(&doc).unwrap_or_else(|| Utc::now().date_naive()),
            category: self.extract_category(url, html),
            url: url.to_string(),
        }
    }

    fn extract_body(&self, html: &str) -> Option<BodyRegion> {
        let doc = dom::parse_document(html);
        dom::body_fallback_chain(&doc, BODY_SELECTORS)
    }

    async fn scrape(&self, client: &FetchClient, url: &str) -> Result<ScrapedDocument> {
        textgen::scrape_translated(self, self.text_service.as_deref(), client, url).await
    }
}
