//! Nautilus articles (`nautil.us`).

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

const NON_AUTHORS: &[&str] = &["nautilus", "nautilus editors"];
const BODY_SELECTORS: &[&str] = &[
    "article",
    r#"div[class*="article-content"]"#,
    r#"div[class*="post-content"]"#,
    "main",
];

pub struct NautilusExtractor {
    text_service: Option<Arc<dyn TextService>>,
}

impl NautilusExtractor {
    pub fn new(text_service: Option<Arc<dyn TextService>>) -> Self {
        Self { text_service }
    }

    fn article_block(doc: &Html) -> Option<Value> {
        dom::json_ld_of_type(doc, "Article").or_else(|| dom::json_ld_of_type(doc, "NewsArticle"))
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
impl Extractor for NautilusExtractor {
    fn claims(&self, url: &str) -> bool {
        Url::parse(url)
            .map(|u| matches!(u.host_str(), Some("nautil.us" | "www.nautil.us")))
            .unwrap_or(false)
    }

    fn source_name(&self) -> &'static str {
        "Nautilus"
    }

    fn source_slug(&self) -> &'static str {
        "nautilus"
    }

    /// Category from the URL path: the segment after `topics/`, or the first
    /// path segment for section-style URLs like `nautil.us/art-science/...`.
    fn extract_category(&self, url: &str, _html: &str) -> String {
        let Ok(parsed) = Url::parse(url) else {
            return "Science".to_string();
        };
        let segments: Vec<&str> = parsed
            .path()
            .trim_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        if let Some(pos) = segments.iter().position(|s| *s == "topics") {
            if let Some(topic) = segments.get(pos + 1) {
                return titlecase_slug(topic);
            }
        }
        match segments.first() {
            Some(first) if segments.len() > 1 && !first.chars().any(|c| c.is_ascii_digit()) => {
                titlecase_slug(first)
            }
            _ => "Science".to_string(),
        }
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

fn titlecase_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|p| !p.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn claims_nautilus_hosts() {
        let x = NautilusExtractor::new(None);
        assert!(x.claims("https://nautil.us/topics/neuroscience/why-we-dream-123/"));
        assert!(x.claims("https://www.nautil.us/art-science/a-piece-456/"));
        assert!(!x.claims("https://aeon.co/essays/x"));
    }

    #[test]
    fn category_from_topics_and_sections() {
        let x = NautilusExtractor::new(None);
        assert_eq!(
            x.extract_category("https://nautil.us/topics/neuroscience/why-we-dream-123/", ""),
            "Neuroscience"
        );
        assert_eq!(
            x.extract_category("https://nautil.us/art-science/a-piece-456/", ""),
            "Art Science"
        );
        assert_eq!(x.extract_category("https://nautil.us/a-piece-456/", ""), "Science");
    }

    #[test]
    fn metadata_falls_through_meta_tags() {
        let html = r#"<html><head>
            <meta property="og:title" content="Why We Dream">
            <meta name="author" content="By Lena Ortiz">
            <meta property="article:published_time" content="2023-11-08T12:30:00-05:00">
            </head><body></body></html>"#;
        let x = NautilusExtractor::new(None);
        let meta = x.extract_metadata("https://nautil.us/topics/neuroscience/why-we-dream/", html);
        assert_eq!(meta.title, "Why We Dream");
        assert_eq!(meta.author, "Lena Ortiz");
        assert_eq!(meta.date, NaiveDate::from_ymd_opt(2023, 11, 8).unwrap());
    }

    #[test]
    fn site_placeholder_author_is_rejected() {
        let html = r#"<html><head>
            <meta name="author" content="Nautilus Editors">
            </head><body></body></html>"#;
        let x = NautilusExtractor::new(None);
        let meta = x.extract_metadata("https://nautil.us/a/b", html);
        assert_eq!(meta.author, DEFAULT_AUTHOR);
    }

    #[test]
    fn body_requires_sufficient_prose() {
        let x = NautilusExtractor::new(None);
        assert!(x
            .extract_body("<html><body><article><p>teaser</p></article></body></html>")
            .is_none());
    }
}
