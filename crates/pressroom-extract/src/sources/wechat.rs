//! WeChat public-account articles (`mp.weixin.qq.com/s/...`).
//!
//! The category is the publishing account's nickname, which only appears in
//! inline script data, so this extractor works on the raw HTML as much as
//! on the DOM.

use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use scraper::Html;

use crate::dom;
use crate::extractor::{
    BodyRegion, ExtractedMetadata, Extractor, DEFAULT_AUTHOR, DEFAULT_TITLE,
};

const SOURCE_NAME: &str = "公众号";

const BODY_SELECTORS: &[&str] = &[
    "#js_content",
    r#"div[class*="rich_media_content"]"#,
    "article",
    "main",
];

fn profile_nickname_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)profile_nickname\s*[:=]\s*["']([^"']+)["']"#).expect("static regex")
    })
}

fn nickname_field_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)["']nickname["']\s*:\s*["']([^"']+)["']"#).expect("static regex")
    })
}

pub struct WechatExtractor;

impl WechatExtractor {
    pub fn new() -> Self {
        Self
    }

    fn title(&self, doc: &Html) -> String {
        dom::meta_property(doc, "og:title")
            .or_else(|| dom::first_heading(doc))
            .or_else(|| dom::page_title(doc).map(|t| dom::strip_title_suffix(&t)))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }

    fn author(&self, doc: &Html, html: &str) -> String {
        dom::meta_name(doc, "author")
            .or_else(|| dom::meta_property(doc, "article:author"))
            .and_then(|a| dom::clean_author(&a, &[]))
            // Articles without a byline are credited to the account itself.
            .or_else(|| account_nickname(html))
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string())
    }
}

impl Default for WechatExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishing account nickname from inline script data.
fn account_nickname(html: &str) -> Option<String> {
    profile_nickname_re()
        .captures(html)
        .or_else(|| nickname_field_re().captures(html))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|n| !n.is_empty())
}

#[async_trait::async_trait]
impl Extractor for WechatExtractor {
    fn claims(&self, url: &str) -> bool {
        url.starts_with("https://mp.weixin.qq.com/s/") || url.starts_with("http://mp.weixin.qq.com/s/")
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn source_slug(&self) -> &'static str {
        "wechat"
    }

    fn extract_category(&self, _url: &str, html: &str) -> String {
        account_nickname(html).unwrap_or_else(|| SOURCE_NAME.to_string())
    }

    fn extract_metadata(&self, url: &str, html: &str) -> ExtractedMetadata {
        let doc = dom::parse_document(html);
        let date = dom::meta_property(&doc, "article:published_time")
            .and_then(|d| dom::parse_iso_date_cn(&d))
            .unwrap_or_else(|| Utc::now().date_naive());
        ExtractedMetadata {
            title: self.title(&doc),
            author: self.author(&doc, html),
            date,
            category: self.extract_category(url, html),
            url: url.to_string(),
        }
    }

    fn extract_body(&self, html: &str) -> Option<BodyRegion> {
        let doc = dom::parse_document(html);
        for selector in BODY_SELECTORS {
            if let Some(region) = dom::select_region(&doc, selector) {
                if !region.text.is_empty() {
                    return Some(region);
                }
            }
        }
        dom::select_region(&doc, "body").filter(|r| !r.text.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const FIXTURE: &str = r#"<html><head>
        <meta property="og:title" content="城市漫步指南">
        <meta property="article:published_time" content="2024-07-15T22:40:00">
        <script>var profile_nickname = "慢速电台";</script>
        </head><body>
        <div id="js_content"><p>正文第一段。</p><p>正文第二段。</p></div>
        </body></html>"#;

    #[test]
    fn claims_share_links_only() {
        let x = WechatExtractor::new();
        assert!(x.claims("https://mp.weixin.qq.com/s/abc123"));
        assert!(!x.claims("https://mp.weixin.qq.com/profile"));
        assert!(!x.claims("https://weixin.qq.com/s/abc123"));
    }

    #[test]
    fn category_is_account_nickname() {
        let x = WechatExtractor::new();
        assert_eq!(x.extract_category("https://mp.weixin.qq.com/s/a", FIXTURE), "慢速电台");
        assert_eq!(
            x.extract_category("https://mp.weixin.qq.com/s/a", "<html></html>"),
            SOURCE_NAME
        );
    }

    #[test]
    fn nickname_json_shape_is_also_recognized() {
        let html = r#"<script>window.data = {"nickname": "夜航船"};</script>"#;
        assert_eq!(account_nickname(html).as_deref(), Some("夜航船"));
    }

    #[test]
    fn naive_timestamps_are_read_in_cn_time() {
        let x = WechatExtractor::new();
        let meta = x.extract_metadata("https://mp.weixin.qq.com/s/a", FIXTURE);
        assert_eq!(meta.title, "城市漫步指南");
        assert_eq!(meta.date, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
        assert_eq!(meta.author, "慢速电台");
    }

    #[test]
    fn body_prefers_js_content() {
        let x = WechatExtractor::new();
        let body = x.extract_body(FIXTURE).unwrap();
        assert!(body.text.contains("正文第一段"));
        assert!(body.html.contains("js_content"));
    }
}
