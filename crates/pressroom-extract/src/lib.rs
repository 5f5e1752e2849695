//! Per-source content extraction.
//!
//! Each supported publication implements [`Extractor`]; the [`Registry`]
//! resolves a URL to the first extractor that claims it. Shared DOM
//! heuristics (structured data, meta tags, largest-text-block fallback,
//! body sufficiency) live in [`dom`].

pub mod dom;
pub mod extractor;
pub mod registry;
pub mod sources;
pub mod textgen;

pub use extractor::{BodyRegion, ExtractedMetadata, Extractor, ScrapedDocument};
pub use registry::Registry;
pub use textgen::{
    scrape_translated, translate_body, with_retry, TextService, TEXT_RETRIES, TEXT_RETRY_DELAY,
};
