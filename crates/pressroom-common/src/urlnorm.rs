//! URL normalization and path-derived category fallback.

use url::Url;

/// Site sections recognized in article URL paths.
const KNOWN_SECTIONS: &[&str] = &[
    "news",
    "books",
    "culture",
    "magazine",
    "humor",
    "cartoons",
    "puzzles-and-games-dept",
    "newsletter",
    "video",
    "podcast",
    "podcasts",
];

/// Canonical comparison form of a URL: query string, fragment and any
/// trailing slash removed. Unparseable input falls back to trimming the
/// trailing slash only, so equality stays conservative.
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    match Url::parse(raw) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string().trim_end_matches('/').to_string()
        }
        Err(_) => raw.trim_end_matches('/').to_string(),
    }
}

/// Derive a category from the URL path against the known-section list.
/// `"na"` and unmatched paths map to `default`.
pub fn category_from_url(raw: &str, default: &str) -> String {
    let Ok(parsed) = Url::parse(raw) else {
        return default.to_string();
    };
    for segment in parsed.path().trim_matches('/').split('/') {
        let segment = segment.to_ascii_lowercase();
        if segment == "na" {
            return default.to_string();
        }
        if KNOWN_SECTIONS.contains(&segment.as_str()) {
            return segment;
        }
    }
    default.to_string()
}
