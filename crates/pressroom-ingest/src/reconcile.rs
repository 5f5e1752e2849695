//! Reconciliation of freshly extracted metadata against the store.
//!
//! Matching runs an ordered list of strategies and the first unique hit
//! wins; a strategy that matches more than one record is treated as no
//! match. The merge is a one-way ratchet: primary fields always take the
//! newest extraction, secondary-language fields are only overwritten when
//! the new extraction actually produced a distinct variant, and a stored
//! URL is never replaced, only backfilled when empty.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use pressroom_common::{normalize_url, Result};
use pressroom_store::{Article, ArticleStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    ExactUrl,
    NormalizedUrl,
    BodyFile,
    TitleAuthorDate,
}

pub const DEFAULT_STRATEGIES: [MatchStrategy; 4] = [
    MatchStrategy::ExactUrl,
    MatchStrategy::NormalizedUrl,
    MatchStrategy::BodyFile,
    MatchStrategy::TitleAuthorDate,
];

/// One extraction's worth of fields, ready to be matched and merged.
#[derive(Debug, Clone)]
pub struct RecordDraft {
    pub title: String,
    pub title_zh: Option<String>,
    pub date: NaiveDate,
    pub category: String,
    pub author: String,
    pub source: String,
    /// May be empty for offline imports; then URL-based strategies are
    /// skipped and the stored URL is left for a later backfill.
    pub url: String,
    pub body_file: String,
    pub body_file_zh: Option<String>,
    pub starred: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created(Uuid),
    Updated(Uuid),
}

impl ReconcileOutcome {
    pub fn article_id(&self) -> Uuid {
        match self {
            Self::Created(id) | Self::Updated(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
}

pub struct Reconciler {
    store: Arc<dyn ArticleStore>,
    strategies: Vec<MatchStrategy>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self::with_strategies(store, DEFAULT_STRATEGIES.to_vec())
    }

    pub fn with_strategies(store: Arc<dyn ArticleStore>, strategies: Vec<MatchStrategy>) -> Self {
        Self { store, strategies }
    }

    pub fn store(&self) -> &Arc<dyn ArticleStore> {
        &self.store
    }

    /// Match the draft against the store, then update in place or create.
    /// Idempotent: reconciling the same draft twice leaves one record whose
    /// fields differ only in `updated_at`.
    pub async fn reconcile(&self, draft: &RecordDraft) -> Result<ReconcileOutcome> {
        match self.find_match(draft).await? {
            Some(mut existing) => {
                apply_draft(&mut existing, draft);
                self.store.update(&existing).await?;
                debug!(article_id = %existing.id, title = %existing.title, "article updated");
                Ok(ReconcileOutcome::Updated(existing.id))
            }
            None => {
                let article = new_article(draft);
                self.store.insert(&article).await?;
                debug!(article_id = %article.id, title = %article.title, "article created");
                Ok(ReconcileOutcome::Created(article.id))
            }
        }
    }

    /// Reconcile a batch with per-item failure isolation: one bad item is
    /// logged and counted, the rest of the batch continues.
    pub async fn reconcile_batch(&self, drafts: &[RecordDraft]) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for draft in drafts {
            match self.reconcile(draft).await {
                Ok(ReconcileOutcome::Created(_)) => summary.created += 1,
                Ok(ReconcileOutcome::Updated(_)) => summary.updated += 1,
                Err(e) => {
                    warn!(title = %draft.title, url = %draft.url, error = %e,
                        "reconcile failed, continuing batch");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    async fn find_match(&self, draft: &RecordDraft) -> Result<Option<Article>> {
        for strategy in &self.strategies {
            let hit = match strategy {
                MatchStrategy::ExactUrl => {
                    if draft.url.is_empty() {
                        None
                    } else {
                        self.store.find_by_url(&draft.url).await?
                    }
                }
                MatchStrategy::NormalizedUrl => {
                    if draft.url.is_empty() {
                        None
                    } else {
                        let hits = self
                            .store
                            .find_by_normalized_url(&normalize_url(&draft.url))
                            .await?;
                        unique_hit(hits, "normalized url", &draft.url)
                    }
                }
                MatchStrategy::BodyFile => {
                    if draft.body_file.is_empty() {
                        None
                    } else {
                        self.store.find_by_body_file(&draft.body_file).await?
                    }
                }
                MatchStrategy::TitleAuthorDate => {
                    let hits = self
                        .store
                        .find_by_title_author_date(&draft.title, &draft.author, draft.date)
                        .await?;
                    unique_hit(hits, "title/author/date", &draft.title)
                }
            };
            if let Some(article) = hit {
                return Ok(Some(article));
            }
        }
        Ok(None)
    }
}

fn unique_hit(hits: Vec<Article>, strategy: &str, key: &str) -> Option<Article> {
    match hits.len() {
        0 => None,
        1 => hits.into_iter().next(),
        n => {
            warn!(strategy, key, candidates = n, "ambiguous match treated as no match");
            None
        }
    }
}

fn new_article(draft: &RecordDraft) -> Article {
    let now = Utc::now();
    Article {
        id: Uuid::new_v4(),
        title: draft.title.clone(),
        title_zh: secondary_title(draft),
        date: draft.date,
        category: draft.category.clone(),
        author: draft.author.clone(),
        source: draft.source.clone(),
        original_url: draft.url.clone(),
        body_file: draft.body_file.clone(),
        body_file_zh: draft.body_file_zh.clone(),
        starred: draft.starred,
        created_at: now,
        updated_at: now,
    }
}

fn apply_draft(existing: &mut Article, draft: &RecordDraft) {
    existing.title = draft.title.clone();
    existing.date = draft.date;
    existing.category = draft.category.clone();
    existing.author = draft.author.clone();
    existing.source = draft.source.clone();
    existing.body_file = draft.body_file.clone();

    // Secondary-language fields only move forward when the new extraction
    // produced a real variant; an absent variant never clears stored ones.
    if let Some(zh) = secondary_title(draft) {
        existing.title_zh = Some(zh);
    }
    if let Some(zh_file) = &draft.body_file_zh {
        existing.body_file_zh = Some(zh_file.clone());
    }

    if existing.original_url.is_empty() && !draft.url.is_empty() {
        existing.original_url = draft.url.clone();
    }
    existing.updated_at = Utc::now();
}

/// A secondary title identical to the primary is a scrape artifact, not a
/// translation.
fn secondary_title(draft: &RecordDraft) -> Option<String> {
    draft
        .title_zh
        .as_ref()
        .filter(|zh| **zh != draft.title)
        .cloned()
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pressroom_common::PressroomError;
    use pressroom_store::MemoryStore;

    use super::*;

    fn draft(url: &str, body_file: &str) -> RecordDraft {
        RecordDraft {
            title: "A Quiet Mind".to_string(),
            title_zh: None,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            category: "Philosophy".to_string(),
            author: "Ada Voss".to_string(),
            source: "Aeon".to_string(),
            url: url.to_string(),
            body_file: body_file.to_string(),
            body_file_zh: None,
            starred: false,
        }
    }

    fn reconciler() -> (Reconciler, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Reconciler::new(store.clone()), store)
    }

    #[tokio::test]
    async fn reconcile_is_idempotent() {
        let (rec, store) = reconciler();
        let d = draft("https://aeon.co/essays/a", "en/a.html");

        let first = rec.reconcile(&d).await.unwrap();
        let second = rec.reconcile(&d).await.unwrap();

        assert!(matches!(first, ReconcileOutcome::Created(_)));
        assert!(matches!(second, ReconcileOutcome::Updated(_)));
        assert_eq!(first.article_id(), second.article_id());
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn normalized_url_matches_tracking_variants() {
        let (rec, store) = reconciler();
        rec.reconcile(&draft("https://aeon.co/essays/a", "en/a.html"))
            .await
            .unwrap();

        let out = rec
            .reconcile(&draft("https://aeon.co/essays/a/?utm_source=feed", "en/a2.html"))
            .await
            .unwrap();
        assert!(matches!(out, ReconcileOutcome::Updated(_)));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn body_file_match_backfills_empty_url() {
        let (rec, store) = reconciler();
        // Offline import: no URL yet.
        let created = rec.reconcile(&draft("", "en/a.html")).await.unwrap();

        let out = rec
            .reconcile(&draft("https://aeon.co/essays/a", "en/a.html"))
            .await
            .unwrap();
        assert_eq!(out.article_id(), created.article_id());

        let stored = store.find_by_id(out.article_id()).await.unwrap().unwrap();
        assert_eq!(stored.original_url, "https://aeon.co/essays/a");
    }

    #[tokio::test]
    async fn stored_url_is_never_replaced() {
        let (rec, store) = reconciler();
        rec.reconcile(&draft("https://aeon.co/essays/a", "en/a.html"))
            .await
            .unwrap();

        // Different URL, same body file: matches via the locator strategy.
        let out = rec
            .reconcile(&draft("https://aeon.co/essays/a-moved", "en/a.html"))
            .await
            .unwrap();
        let stored = store.find_by_id(out.article_id()).await.unwrap().unwrap();
        assert_eq!(stored.original_url, "https://aeon.co/essays/a");
    }

    #[tokio::test]
    async fn title_author_date_is_the_last_resort() {
        let (rec, store) = reconciler();
        rec.reconcile(&draft("", "en/a.html")).await.unwrap();

        let mut d = draft("", "en/relocated.html");
        d.title = " a quiet  mind ".to_string();
        let out = rec.reconcile(&d).await.unwrap();
        assert!(matches!(out, ReconcileOutcome::Updated(_)));
        assert_eq!(store.count().await.unwrap(), 1);
        let stored = store.find_by_id(out.article_id()).await.unwrap().unwrap();
        assert_eq!(stored.body_file, "en/relocated.html");
    }

    #[tokio::test]
    async fn secondary_fields_ratchet_forward_only() {
        let (rec, store) = reconciler();
        let mut with_zh = draft("https://aeon.co/essays/a", "en/a.html");
        with_zh.title_zh = Some("安静的心".to_string());
        with_zh.body_file_zh = Some("zh/a.html".to_string());
        let id = rec.reconcile(&with_zh).await.unwrap().article_id();

        // A later extraction without a secondary variant keeps the stored one.
        rec.reconcile(&draft("https://aeon.co/essays/a", "en/a.html"))
            .await
            .unwrap();
        let stored = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.title_zh.as_deref(), Some("安静的心"));
        assert_eq!(stored.body_file_zh.as_deref(), Some("zh/a.html"));

        // A secondary title equal to the primary is ignored.
        let mut echo = draft("https://aeon.co/essays/a", "en/a.html");
        echo.title_zh = Some(echo.title.clone());
        rec.reconcile(&echo).await.unwrap();
        let stored = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.title_zh.as_deref(), Some("安静的心"));
    }

    #[tokio::test]
    async fn primary_fields_always_take_newest_extraction() {
        let (rec, store) = reconciler();
        let id = rec
            .reconcile(&draft("https://aeon.co/essays/a", "en/a.html"))
            .await
            .unwrap()
            .article_id();

        let mut newer = draft("https://aeon.co/essays/a", "en/a-v2.html");
        newer.title = "A Quieter Mind".to_string();
        newer.category = "Psychology".to_string();
        rec.reconcile(&newer).await.unwrap();

        let stored = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.title, "A Quieter Mind");
        assert_eq!(stored.category, "Psychology");
        assert_eq!(stored.body_file, "en/a-v2.html");
    }

    #[tokio::test]
    async fn strategy_order_is_configurable() {
        let store = Arc::new(MemoryStore::new());
        let rec = Reconciler::with_strategies(store.clone(), vec![MatchStrategy::BodyFile]);
        rec.reconcile(&draft("https://aeon.co/essays/a", "en/a.html"))
            .await
            .unwrap();

        // Same URL but a different body file: with only the body-file
        // strategy active this is treated as new, and the URL constraint
        // turns it into a conflict.
        let err = rec
            .reconcile(&draft("https://aeon.co/essays/a", "en/b.html"))
            .await
            .unwrap_err();
        assert!(matches!(err, PressroomError::Conflict(_)));
    }

    // Store wrapper that fails inserts for a marker title, for batch
    // isolation tests.
    struct FaultyStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl ArticleStore for FaultyStore {
        async fn insert(&self, article: &Article) -> pressroom_common::Result<()> {
            if article.title.contains("poison") {
                return Err(PressroomError::Extraction("injected insert failure".into()));
            }
            self.inner.insert(article).await
        }
        async fn update(&self, article: &Article) -> pressroom_common::Result<()> {
            self.inner.update(article).await
        }
        async fn find_by_id(&self, id: Uuid) -> pressroom_common::Result<Option<Article>> {
            self.inner.find_by_id(id).await
        }
        async fn find_by_url(&self, url: &str) -> pressroom_common::Result<Option<Article>> {
            self.inner.find_by_url(url).await
        }
        async fn find_by_normalized_url(
            &self,
            normalized: &str,
        ) -> pressroom_common::Result<Vec<Article>> {
            self.inner.find_by_normalized_url(normalized).await
        }
        async fn find_by_body_file(
            &self,
            body_file: &str,
        ) -> pressroom_common::Result<Option<Article>> {
            self.inner.find_by_body_file(body_file).await
        }
        async fn find_by_title_author_date(
            &self,
            title: &str,
            author: &str,
            date: NaiveDate,
        ) -> pressroom_common::Result<Vec<Article>> {
            self.inner.find_by_title_author_date(title, author, date).await
        }
        async fn count(&self) -> pressroom_common::Result<u64> {
            self.inner.count().await
        }
    }

    #[tokio::test]
    async fn batch_isolates_per_item_failures() {
        let store = Arc::new(FaultyStore {
            inner: MemoryStore::new(),
        });
        let rec = Reconciler::new(store.clone());

        let mut poisoned = draft("https://aeon.co/essays/b", "en/b.html");
        poisoned.title = "poison pill".to_string();
        let batch = vec![
            draft("https://aeon.co/essays/a", "en/a.html"),
            poisoned,
            draft("https://aeon.co/essays/c", "en/c.html"),
        ];

        let summary = rec.reconcile_batch(&batch).await;
        assert_eq!(summary.created, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(store.count().await.unwrap(), 2);
    }
}
