//! Aeon essays. Handles `aeon.co/essays/...` only; video pages are skipped.

use std::sync::Arc;

use chrono::Utc;
use scraper::Html;
use serde_json::Value;
use url::Url;

use pressroom_common::{FetchClient, Result};

use crate::dom;
use crate::extractor::{
    BodyRegion, ExtractedMetadata, Extractor, ScrapedDocument, DEFAULT_AUTHOR, DEFAULT_TITLE,
};
use crate::textgen::{self, TextService};

const CATEGORIES: &[&str] = &["philosophy", "science", "psychology", "society", "culture"];
const NON_AUTHORS: &[&str] = &["aeon"];
const BODY_SELECTORS: &[&str] = &[
    "article",
    r#"div[class*="article-content"]"#,
    r#"div[class*="essay"]"#,
    "main",
];

pub struct AeonExtractor {
    text_service: Option<Arc<dyn TextService>>,
}

impl AeonExtractor {
    pub fn new(text_service: Option<Arc<dyn TextService>>) -> Self {
        Self { text_service }
    }

    fn title(&self, doc: &Html) -> String {
        if let Some(article) = dom::json_ld_of_type(doc, "Article") {
            if let Some(headline) = article.get("headline").and_then(Value::as_str) {
                let headline = headline.trim();
                if !headline.is_empty() {
                    return headline.to_string();
                }
            }
        }
        dom::meta_property(doc, "og:title")
            .or_else(|| dom::first_heading(doc))
            .or_else(|| {
                dom::page_title(doc).map(|t| {
                    t.split('|').next().unwrap_or(&t).trim().to_string()
                })
            })
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }

    fn author(&self, doc: &Html) -> String {
        let from_json_ld = dom::json_ld_of_type(doc, "Article")
            .as_ref()
            .and_then(dom::json_ld_author)
            .and_then(|a| dom::clean_author(&a, NON_AUTHORS));
        from_json_ld
            .or_else(|| {
                dom::meta_property(doc, "article:author")
                    .or_else(|| dom::meta_name(doc, "author"))
                    .and_then(|a| dom::clean_author(&a, NON_AUTHORS))
            })
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string())
    }

    fn date(&self, doc: &Html) -> Option<chrono::NaiveDate> {
        dom::json_ld_of_type(doc, "Article")
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
impl Extractor for AeonExtractor {
    fn claims(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|u| {
                matches!(u.host_str(), Some("aeon.co" | "www.aeon.co"))
                    && u.path().starts_with("/essays/")
            })
            .unwrap_or(false)
    }

    fn source_name(&self) -> &'static str {
        "Aeon"
    }

    fn source_slug(&self) -> &'static str {
        "aeon"
    }

    fn extract_category(&self, url: &str, html: &str) -> String {
        let doc = dom::parse_document(html);
        // Breadcrumb first: the first crumb is usually the topic.
        if let Some(breadcrumb) = dom::json_ld_of_type(&doc, "BreadcrumbList") {
            let first_name = breadcrumb
                .get("itemListElement")
                .and_then(Value::as_array)
                .and_then(|items| items.first())
                .and_then(|item| item.get("name"))
                .and_then(Value::as_str)
                .map(str::trim);
            if let Some(name) = first_name {
                if !name.is_empty()
                    && !["essays", "aeon", "home"].contains(&name.to_lowercase().as_str())
                {
                    return name.to_string();
                }
            }
        }
        if let Ok(parsed) = Url::parse(url) {
            for segment in parsed.path().trim_matches('/').split('/') {
                let lowered = segment.to_lowercase();
                if CATEGORIES.contains(&lowered.as_str()) {
                    return capitalize(&lowered);
                }
            }
        }
        "Essays".to_string()
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

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
