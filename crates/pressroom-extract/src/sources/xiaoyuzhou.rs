//! Xiaoyuzhou (小宇宙) podcast episodes.
//!
//! The body is the episode's shownotes; when a [`TextService`] is
//! configured, the episode audio is downloaded and transcribed, and an
//! article-style summary replaces the raw shownotes as the primary body.

use std::sync::Arc;
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use pressroom_common::{FetchClient, Result};

use crate::dom;
use crate::extractor::{
    BodyRegion, ExtractedMetadata, Extractor, ScrapedDocument, DEFAULT_AUTHOR, DEFAULT_TITLE,
};
use crate::textgen::{with_retry, TextService, TEXT_RETRIES, TEXT_RETRY_DELAY};

const SOURCE_NAME: &str = "小宇宙";

const SHOWNOTES_SELECTORS: &[&str] = &[
    r#"div[class*="shownotes"]"#,
    r#"div[class*="show-notes"]"#,
    r#"div[class*="episode-notes"]"#,
    r#"div[class*="description"]"#,
    r#"section[class*="episode"]"#,
    "main",
];

fn mp3_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)https?://[^\s"'<>)]+\.mp3[^\s"'<>)]*"#).expect("static regex")
    })
}

pub struct XiaoyuzhouExtractor {
    text_service: Option<Arc<dyn TextService>>,
}

impl XiaoyuzhouExtractor {
    pub fn new(text_service: Option<Arc<dyn TextService>>) -> Self {
        Self { text_service }
    }

    fn episode_block(doc: &Html) -> Option<Value> {
        dom::json_ld_of_type(doc, "PodcastEpisode").or_else(|| dom::json_ld_of_type(doc, "Episode"))
    }

    fn title(&self, doc: &Html) -> String {
        dom::meta_property(doc, "og:title")
            .or_else(|| dom::first_heading(doc))
            .or_else(|| dom::page_title(doc).map(|t| dom::strip_title_suffix(&t)))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }

    fn author(&self, doc: &Html) -> String {
        dom::meta_name(doc, "author")
            .and_then(|a| dom::clean_author(&a, &[]))
            .or_else(|| {
                Self::episode_block(doc)
                    .as_ref()
                    .and_then(dom::json_ld_author)
            })
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string())
    }

    /// The show name doubles as the category.
    fn show_name(&self, doc: &Html) -> Option<String> {
        dom::meta_property(doc, "og:site_name")
            .filter(|n| n != SOURCE_NAME && !n.is_empty())
            .or_else(|| {
                Self::episode_block(doc).and_then(|e| {
                    e.get("partOfSeries")
                        .and_then(|s| s.get("name"))
                        .and_then(Value::as_str)
                        .map(|n| n.trim().to_string())
                        .filter(|n| !n.is_empty())
                })
            })
            .or_else(|| {
                // Page titles look like "episode title - show name".
                let title = dom::page_title(doc)?;
                let (_, show) = title.rsplit_once('-')?;
                let show = show.trim();
                (!show.is_empty()).then(|| show.to_string())
            })
    }

    fn date(&self, doc: &Html) -> Option<chrono::NaiveDate> {
        dom::meta_property(doc, "article:published_time")
            .and_then(|d| dom::parse_iso_date_cn(&d))
            .or_else(|| {
                Self::episode_block(doc).and_then(|e| {
                    e.get("datePublished")
                        .and_then(Value::as_str)
                        .and_then(dom::parse_iso_date_cn)
                })
            })
    }
}

/// Locate the episode audio URL: the `<audio>` element, any mp3 URL in
/// inline scripts (CDN-looking hosts preferred), then `data-audio`
/// attributes.
pub fn find_audio_url(html: &str) -> Option<String> {
    let doc = dom::parse_document(html);
    if let Ok(sel) = Selector::parse("audio[src], audio source[src]") {
        if let Some(src) = doc
            .select(&sel)
            .filter_map(|el| el.value().attr("src"))
            .find(|s| !s.is_empty())
        {
            return Some(src.to_string());
        }
    }

    let candidates: Vec<&str> = mp3_url_re().find_iter(html).map(|m| m.as_str()).collect();
    if !candidates.is_empty() {
        let preferred = candidates.iter().find(|u| {
            let lowered = u.to_lowercase();
            lowered.contains("cdn") || lowered.contains("audio") || lowered.contains("media")
        });
        return Some((*preferred.unwrap_or(&candidates[0])).to_string());
    }

    if let Ok(sel) = Selector::parse("[data-audio]") {
        if let Some(src) = doc
            .select(&sel)
            .filter_map(|el| el.value().attr("data-audio"))
            .find(|s| !s.is_empty())
        {
            return Some(src.to_string());
        }
    }
    None
}

#[async_trait::async_trait]
impl Extractor for XiaoyuzhouExtractor {
    fn claims(&self, url: &str) -> bool {
        Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .map(|host| {
                host == "xiaoyuzhou.fm"
                    || host.ends_with(".xiaoyuzhou.fm")
                    || host == "xiaoyuzhoufm.com"
                    || host.ends_with(".xiaoyuzhoufm.com")
            })
            .unwrap_or(false)
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn source_slug(&self) -> &'static str {
        "xiaoyuzhou"
    }

    fn extract_category(&self, _url: &str, html: &str) -> String {
        let doc = dom::parse_document(html);
        self.show_name(&doc)
            .unwrap_or_else(|| SOURCE_NAME.to_string())
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

    /// Shownotes, falling back to the JSON-LD episode description.
    fn extract_body(&self, html: &str) -> Option<BodyRegion> {
        let doc = dom::parse_document(html);
        for selector in SHOWNOTES_SELECTORS {
            if let Some(region) = dom::select_region(&doc, selector) {
                if !region.text.is_empty() {
                    return Some(region);
                }
            }
        }
        if let Some(description) = Self::episode_block(&doc).and_then(|e| {
            e.get("description")
                .and_then(Value::as_str)
                .map(str::to_string)
        }) {
            let description = description.trim().to_string();
            if !description.is_empty() {
                return Some(BodyRegion {
                    html: dom::text_to_html(&description),
                    text: description.split_whitespace().collect::<Vec<_>>().join(" "),
                });
            }
        }
        dom::select_region(&doc, "body").filter(|r| !r.text.is_empty())
    }

    async fn scrape(&self, client: &FetchClient, url: &str) -> Result<ScrapedDocument> {
        let page_html = client.get_text(url).await?;
        let meta = self.extract_metadata(url, &page_html);
        let shownotes = self.extract_body(&page_html);

        let Some(text_service) = &self.text_service else {
            debug!(url = %url, "no text service configured, archiving shownotes only");
            return Ok(ScrapedDocument {
                meta,
                page_html,
                body: shownotes,
                body_zh: None,
                title_zh: None,
            });
        };

        let Some(audio_url) = find_audio_url(&page_html) else {
            warn!(url = %url, "episode audio not found, archiving shownotes only");
            return Ok(ScrapedDocument {
                meta,
                page_html,
                body: shownotes,
                body_zh: None,
                title_zh: None,
            });
        };

        info!(url = %url, audio_url = %audio_url, "transcribing episode audio");
        let audio = client.get_bytes(&audio_url).await?;
        let transcript = with_retry(TEXT_RETRIES, TEXT_RETRY_DELAY, || {
            text_service.transcribe_audio(&audio)
        })
        .await?;

        let notes_text = shownotes.as_ref().map(|r| r.text.clone()).unwrap_or_default();
        let summary = with_retry(TEXT_RETRIES, TEXT_RETRY_DELAY, || {
            text_service.summarize_episode(&notes_text, &transcript)
        })
        .await?;

        let body = BodyRegion {
            html: dom::text_to_html(&summary),
            text: summary.split_whitespace().collect::<Vec<_>>().join(" "),
        };
        Ok(ScrapedDocument {
            meta,
            page_html,
            body: Some(body),
            body_zh: None,
            title_zh: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    const FIXTURE: &str = r#"<html><head>
        <meta property="og:title" content="第42期：深海的声音">
        <meta property="og:site_name" content="潜水电台">
        <meta property="article:published_time" content="2024-02-10T08:00:00+08:00">
        <script type="application/ld+json">
        {"@type":"PodcastEpisode","author":{"name":"阿青"},
         "partOfSeries":{"name":"潜水电台"},
         "description":"本期我们聊聊深海。"}
        </script>
        <script>var player = {"audioUrl": "https://cdn.example.com/ep42.mp3?sig=1"};</script>
        </head><body>
        <div class="shownotes-wrap"><p>本期嘉宾与时间轴。</p></div>
        </body></html>"#;

    #[test]
    fn claims_both_hosts() {
        let x = XiaoyuzhouExtractor::new(None);
        assert!(x.claims("https://www.xiaoyuzhou.fm/episode/abc"));
        assert!(x.claims("https://www.xiaoyuzhoufm.com/episode/abc"));
        assert!(!x.claims("https://example.com/episode/abc"));
    }

    #[test]
    fn show_name_is_the_category() {
        let x = XiaoyuzhouExtractor::new(None);
        assert_eq!(
            x.extract_category("https://www.xiaoyuzhou.fm/episode/a", FIXTURE),
            "潜水电台"
        );
    }

    #[test]
    fn metadata_reads_cn_offset_dates() {
        let x = XiaoyuzhouExtractor::new(None);
        let meta = x.extract_metadata("https://www.xiaoyuzhou.fm/episode/a", FIXTURE);
        assert_eq!(meta.title, "第42期：深海的声音");
        assert_eq!(meta.author, "阿青");
        assert_eq!(meta.date, NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
    }

    #[test]
    fn shownotes_selector_wins() {
        let x = XiaoyuzhouExtractor::new(None);
        let body = x.extract_body(FIXTURE).unwrap();
        assert!(body.text.contains("嘉宾"));
    }

    #[test]
    fn audio_url_prefers_cdn_hosts() {
        assert_eq!(
            find_audio_url(FIXTURE).as_deref(),
            Some("https://cdn.example.com/ep42.mp3?sig=1")
        );
        let html = r#"<audio src="https://host.example/raw.mp3"></audio>"#;
        assert_eq!(find_audio_url(html).as_deref(), Some("https://host.example/raw.mp3"));
        assert_eq!(find_audio_url("<html></html>"), None);
    }
}
