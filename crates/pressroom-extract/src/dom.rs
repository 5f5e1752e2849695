//! Shared DOM heuristics used by every extractor: meta-tag and JSON-LD
//! lookups, the largest-text-block fallback, access-restriction detection
//! and the body sufficiency check.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::extractor::BodyRegion;

// Sufficiency thresholds. A region that fails these is treated as a teaser
// or access-wall remnant rather than an article body.
const MIN_BODY_CHARS: usize = 200;
const MIN_PARAGRAPH_CHARS: usize = 30;
const MIN_PARAGRAPHS: usize = 3;
const MAX_NOISE_HITS: usize = 5;

const NOISE_KEYWORDS: &[&str] = &["subscribe", "newsletter", "sign in", "log in"];

const BLOCKED_PHRASES: &[&str] = &[
    "subscribe to continue",
    "subscribe now to read",
    "already a subscriber",
    "sign in to continue",
    "create a free account to continue",
    "this article is for subscribers",
];

fn embedded_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+").expect("static regex"))
}

fn title_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*-\s*[^-]+$").expect("static regex"))
}

pub fn parse_document(html: &str) -> Html {
    Html::parse_document(html)
}

/// `<meta property="..." content="...">`
pub fn meta_property(doc: &Html, property: &str) -> Option<String> {
    let sel = Selector::parse(&format!(r#"meta[property="{property}"]"#)).ok()?;
    attr_content(doc, &sel)
}

/// `<meta name="..." content="...">`
pub fn meta_name(doc: &Html, name: &str) -> Option<String> {
    let sel = Selector::parse(&format!(r#"meta[name="{name}"]"#)).ok()?;
    attr_content(doc, &sel)
}

fn attr_content(doc: &Html, sel: &Selector) -> Option<String> {
    doc.select(sel)
        .filter_map(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

pub fn canonical_link(doc: &Html) -> Option<String> {
    let sel = Selector::parse(r#"link[rel="canonical"]"#).ok()?;
    doc.select(&sel)
        .filter_map(|el| el.value().attr("href"))
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

pub fn first_heading(doc: &Html) -> Option<String> {
    first_text(doc, "h1")
}

pub fn page_title(doc: &Html) -> Option<String> {
    first_text(doc, "title")
}

fn first_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel)
        .map(|el| element_text(el))
        .find(|t| !t.is_empty())
}

/// Strip a `" - Site Name"` style suffix from a page title.
pub fn strip_title_suffix(title: &str) -> String {
    title_suffix_re().replace(title.trim(), "").trim().to_string()
}

// ── JSON-LD ───────────────────────────────────────────────────────────────────

/// All parseable `application/ld+json` blocks on the page, top-level arrays
/// flattened.
pub fn json_ld_blocks(doc: &Html) -> Vec<Value> {
    let Ok(sel) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return Vec::new();
    };
    let mut blocks = Vec::new();
    for el in doc.select(&sel) {
        let raw: String = el.text().collect();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(Value::Array(items)) => blocks.extend(items),
            Ok(v) => blocks.push(v),
            Err(_) => {}
        }
    }
    blocks
}

/// First JSON-LD block whose `@type` matches.
pub fn json_ld_of_type(doc: &Html, ty: &str) -> Option<Value> {
    json_ld_blocks(doc)
        .into_iter()
        .find(|v| v.get("@type").and_then(Value::as_str) == Some(ty))
}

/// Author name from a JSON-LD article value; handles string, object and
/// array shapes.
pub fn json_ld_author(article: &Value) -> Option<String> {
    let author = article.get("author")?;
    let name = match author {
        Value::String(s) => Some(s.clone()),
        Value::Object(_) => author
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string),
        Value::Array(items) => items.first().and_then(|first| match first {
            Value::String(s) => Some(s.clone()),
            other => other
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
        _ => None,
    };
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// Body built from a JSON-LD `articleBody` string, one `<p>` per blank-line
/// separated paragraph. Used when an access wall hides the DOM body.
pub fn json_ld_body(doc: &Html) -> Option<BodyRegion> {
    let article = json_ld_of_type(doc, "Article")
        .or_else(|| json_ld_of_type(doc, "NewsArticle"))?;
    let text = article.get("articleBody").and_then(Value::as_str)?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(BodyRegion {
        html: text_to_html(text),
        text: text.split_whitespace().collect::<Vec<_>>().join(" "),
    })
}

/// Wrap plain text in minimal paragraph markup.
pub fn text_to_html(text: &str) -> String {
    let paragraphs: Vec<String> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", escape_text(p)))
        .collect();
    format!("<div>{}</div>", paragraphs.join(""))
}

pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

// ── Regions ───────────────────────────────────────────────────────────────────

pub fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn element_region(el: ElementRef<'_>) -> BodyRegion {
    BodyRegion {
        html: el.html(),
        text: element_text(el),
    }
}

/// First element matching the selector, as a region.
pub fn select_region(doc: &Html, selector: &str) -> Option<BodyRegion> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel).next().map(element_region)
}

/// The container with the most visible text. Last-resort fallback when no
/// conventional selector matches.
pub fn largest_text_block(doc: &Html) -> Option<BodyRegion> {
    let sel = Selector::parse("article, main, section, div").ok()?;
    doc.select(&sel)
        .map(element_region)
        .filter(|r| !r.text.is_empty())
        .max_by_key(|r| r.text.chars().count())
}

/// Ordered fallback chain shared by article sources: access wall check,
/// conventional selectors, JSON-LD body, largest block. Every candidate
/// except the wall-bypass path must pass the sufficiency check.
pub fn body_fallback_chain(doc: &Html, selectors: &[&str]) -> Option<BodyRegion> {
    if is_access_blocked(doc) {
        // The DOM body is a teaser; structured data is the only usable copy.
        return json_ld_body(doc);
    }
    for selector in selectors {
        if let Some(region) = select_region(doc, selector) {
            if is_body_sufficient(&region) {
                return Some(region);
            }
        }
    }
    if let Some(region) = json_ld_body(doc) {
        if is_body_sufficient(&region) {
            return Some(region);
        }
    }
    largest_text_block(doc).filter(is_body_sufficient)
}

// ── Quality gates ─────────────────────────────────────────────────────────────

/// Whether the page shows an access wall instead of the article.
pub fn is_access_blocked(doc: &Html) -> bool {
    if let Some(body) = select_region(doc, "body") {
        let text = body.text.to_lowercase();
        if BLOCKED_PHRASES.iter().any(|p| text.contains(p)) {
            return true;
        }
    }
    if let Ok(sel) =
        Selector::parse(r#"[class*="paywall"], [class*="regwall"], [class*="subscription-wall"]"#)
    {
        if doc.select(&sel).next().is_some() {
            return true;
        }
    }
    false
}

/// Whether a candidate region looks like a real article body: enough total
/// text, enough long paragraphs, not dominated by subscription boilerplate.
pub fn is_body_sufficient(region: &BodyRegion) -> bool {
    let text = region.text.trim();
    if text.chars().count() < MIN_BODY_CHARS {
        return false;
    }

    let fragment = Html::parse_fragment(&region.html);
    if let Ok(p) = Selector::parse("p") {
        let paragraphs: Vec<String> = fragment.select(&p).map(element_text).collect();
        if !paragraphs.is_empty() {
            let long = paragraphs
                .iter()
                .filter(|t| t.chars().count() >= MIN_PARAGRAPH_CHARS)
                .count();
            if long < MIN_PARAGRAPHS {
                return false;
            }
        }
    }

    let lowered = text.to_lowercase();
    let noise: usize = NOISE_KEYWORDS
        .iter()
        .map(|k| lowered.matches(k).count())
        .sum();
    noise <= MAX_NOISE_HITS
}

// ── Dates and authors ─────────────────────────────────────────────────────────

/// Parse an ISO-8601 date or datetime, taking the calendar date in the
/// stated offset. Bare `YYYY-MM-DD` prefixes are accepted.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    s.get(0..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Like [`parse_iso_date`] but assumes UTC+8 when the value carries no
/// offset, for mainland sources that publish naive local timestamps.
pub fn parse_iso_date_cn(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{s}+08:00")) {
        return Some(dt.date_naive());
    }
    s.get(0..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

/// Clean a byline: reject URLs and site-name placeholders, strip embedded
/// links. `invalid` holds per-source names that are not real authors.
pub fn clean_author(raw: &str, invalid: &[&str]) -> Option<String> {
    let mut author = raw.trim();
    for prefix in ["By ", "by ", "BY "] {
        if let Some(rest) = author.strip_prefix(prefix) {
            author = rest.trim_start();
            break;
        }
    }
    if author.len() < 2 {
        return None;
    }
    if author.starts_with("http://") || author.starts_with("https://") || author.starts_with("www.")
    {
        return None;
    }
    if author.matches('/').count() > 2 {
        return None;
    }
    let lowered = author.to_lowercase();
    if ["unknown", "none", "n/a"].contains(&lowered.as_str())
        || invalid.iter().any(|i| i.eq_ignore_ascii_case(author))
    {
        return None;
    }
    let cleaned = embedded_url_re().replace_all(author, "").trim().to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}
