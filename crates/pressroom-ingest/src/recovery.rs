//! Corpus recovery scanner.
//!
//! The on-disk corpus (`en/*.html`, optional `zh/` counterparts) is the
//! durable artifact; database records can lag after a crash or restore.
//! The scanner sweeps the corpus once after a startup settle delay and then
//! on a periodic cadence, re-deriving metadata from the stored pages and
//! pushing every document back through reconciliation. Reconciliation is
//! idempotent, so repeated sweeps converge instead of duplicating.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use pressroom_common::category_from_url;
use pressroom_extract::dom;
use pressroom_extract::extractor::{DEFAULT_AUTHOR, DEFAULT_TITLE};
use pressroom_extract::Registry;

use crate::reconcile::{BatchSummary, Reconciler, RecordDraft};

/// Fields recovered from a `YYYY-MM-DD_category_author_title.html` name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameMeta {
    pub date: NaiveDate,
    pub category: Option<String>,
    pub author: String,
    pub title: String,
}

pub struct RecoveryScanner {
    reconciler: Arc<Reconciler>,
    registry: Arc<Registry>,
    corpus_dir: PathBuf,
    default_source: String,
    settle_delay: Duration,
    interval: Option<Duration>,
}

impl RecoveryScanner {
    pub fn new(
        reconciler: Arc<Reconciler>,
        registry: Arc<Registry>,
        corpus_dir: PathBuf,
        default_source: String,
    ) -> Self {
        Self {
            reconciler,
            registry,
            corpus_dir,
            default_source,
            settle_delay: Duration::from_secs(5),
            interval: Some(Duration::from_secs(24 * 60 * 60)),
        }
    }

    /// Override the startup settle delay and sweep cadence. `interval:
    /// None` means a single startup sweep.
    pub fn with_timing(mut self, settle_delay: Duration, interval: Option<Duration>) -> Self {
        self.settle_delay = settle_delay;
        self.interval = interval;
        self
    }

    /// Run the startup sweep (after the settle delay) and then the periodic
    /// loop, as a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(self.settle_delay).await;
            let summary = self.scan_once().await;
            info!(created = summary.created, updated = summary.updated,
                failed = summary.failed, "startup corpus sweep finished");

            let Some(every) = self.interval else {
                return;
            };
            loop {
                tokio::time::sleep(every).await;
                let summary = self.scan_once().await;
                info!(created = summary.created, updated = summary.updated,
                    failed = summary.failed, "periodic corpus sweep finished");
            }
        })
    }

    /// One full sweep of `en/*.html`.
    pub async fn scan_once(&self) -> BatchSummary {
        let en_dir = self.corpus_dir.join("en");
        let mut entries = match tokio::fs::read_dir(&en_dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %en_dir.display(), error = %e, "corpus dir unreadable, skipping sweep");
                return BatchSummary::default();
            }
        };

        let mut drafts = Vec::new();
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "corpus dir listing failed mid-sweep");
                    break;
                }
            };
            let file_name = entry.file_name().to_string_lossy().to_string();
            if !file_name.ends_with(".html") {
                continue;
            }
            let html = match tokio::fs::read_to_string(entry.path()).await {
                Ok(html) => html,
                Err(e) => {
                    warn!(file = %file_name, error = %e, "corpus file unreadable, skipping");
                    continue;
                }
            };
            let zh_html = tokio::fs::read_to_string(self.corpus_dir.join("zh").join(&file_name))
                .await
                .ok();
            match self.derive_draft(&file_name, &html, zh_html.as_deref()) {
                Some(draft) => drafts.push(draft),
                None => debug!(file = %file_name, "no metadata recoverable, skipping"),
            }
        }

        self.reconciler.reconcile_batch(&drafts).await
    }

    /// Re-derive a draft from one stored page, preferring embedded metadata
    /// and falling back to the filename convention.
    fn derive_draft(
        &self,
        file_name: &str,
        html: &str,
        zh_html: Option<&str>,
    ) -> Option<RecordDraft> {
        let parsed = parse_corpus_filename(file_name);
        let doc = dom::parse_document(html);

        let url = dom::meta_property(&doc, "og:url")
            .or_else(|| dom::canonical_link(&doc))
            .unwrap_or_default();

        let title = dom::meta_property(&doc, "og:title")
            .or_else(|| dom::page_title(&doc).map(|t| dom::strip_title_suffix(&t)))
            .filter(|t| !t.is_empty())
            .or_else(|| parsed.as_ref().map(|p| p.title.clone()))
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());

        let author = dom::meta_property(&doc, "article:author")
            .or_else(|| dom::meta_name(&doc, "author"))
            .and_then(|a| dom::clean_author(&a, &[]))
            .or_else(|| parsed.as_ref().map(|p| p.author.clone()))
            .unwrap_or_else(|| DEFAULT_AUTHOR.to_string());

        // Without any date the record would collide with unrelated ones.
        let date = dom::meta_property(&doc, "article:published_time")
            .and_then(|d| dom::parse_iso_date(&d))
            .or_else(|| parsed.as_ref().map(|p| p.date))?;

        let category = parsed
            .as_ref()
            .and_then(|p| p.category.clone())
            .or_else(|| {
                (!url.is_empty()).then(|| category_from_url(&url, &self.default_source))
            })
            .unwrap_or_else(|| self.default_source.clone());

        let source = if url.is_empty() {
            self.default_source.clone()
        } else {
            self.registry
                .resolve(&url)
                .map(|x| x.source_name().to_string())
                .unwrap_or_else(|| self.default_source.clone())
        };

        let title_zh = zh_html.and_then(|zh| {
            let zh_doc = dom::parse_document(zh);
            // The secondary file's own <h1> is the translated title.
            dom::first_heading(&zh_doc)
                .or_else(|| dom::meta_property(&zh_doc, "og:title"))
                .or_else(|| dom::page_title(&zh_doc).map(|t| dom::strip_title_suffix(&t)))
                .filter(|t| !t.is_empty())
        });

        Some(RecordDraft {
            title,
            title_zh,
            date,
            category,
            author,
            source,
            url,
            body_file: format!("en/{file_name}"),
            body_file_zh: zh_html.map(|_| format!("zh/{file_name}")),
            starred: false,
        })
    }
}

/// Parse the corpus filename convention back into metadata. Underscores in
/// the author and title fields were spaces before slugging.
pub fn parse_corpus_filename(name: &str) -> Option<FilenameMeta> {
    let stem = name.strip_suffix(".html")?;
    let mut parts = stem.splitn(4, '_');
    let date = NaiveDate::parse_from_str(parts.next()?, "%Y-%m-%d").ok()?;
    let category = parts.next()?;
    let author = parts.next()?;
    let title = parts.next()?;
    Some(FilenameMeta {
        date,
        category: (category != "na" && !category.is_empty()).then(|| category.to_string()),
        author: author.replace('_', " "),
        title: title.replace('_', " "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_parse_round_trip() {
        let meta = parse_corpus_filename(
            "2023-11-08_Neuroscience_Lena_Ortiz_Why_We_Dream_A_Field_Guide.html",
        )
        .unwrap();
        assert_eq!(meta.date, NaiveDate::from_ymd_opt(2023, 11, 8).unwrap());
        assert_eq!(meta.category.as_deref(), Some("Neuroscience"));
        assert_eq!(meta.author, "Lena Ortiz");
        assert_eq!(meta.title, "Why We Dream A Field Guide");
    }

    #[test]
    fn filename_parse_handles_na_and_garbage() {
        let meta = parse_corpus_filename("2024-01-02_na_Jo_Field_Title.html").unwrap();
        assert_eq!(meta.category, None);
        assert_eq!(meta.author, "Jo");

        assert!(parse_corpus_filename("notes.txt").is_none());
        assert!(parse_corpus_filename("no-date_cat_author_title.html").is_none());
        assert!(parse_corpus_filename("2024-01-02_only-two.html").is_none());
    }
}
