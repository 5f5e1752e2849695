//! Storage trait between the reconciliation engine and its backends.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use pressroom_common::Result;

use crate::article::Article;

/// Operations the reconciliation engine needs from a backend.
///
/// Lookups that feed a match strategy which must be unique return `Vec` so
/// the caller can detect ambiguous hits; `find_by_url` is backed by a
/// uniqueness constraint and returns at most one record.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    async fn insert(&self, article: &Article) -> Result<()>;
    async fn update(&self, article: &Article) -> Result<()>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>>;
    async fn find_by_url(&self, url: &str) -> Result<Option<Article>>;
    async fn find_by_normalized_url(&self, normalized: &str) -> Result<Vec<Article>>;
    async fn find_by_body_file(&self, body_file: &str) -> Result<Option<Article>>;
    async fn find_by_title_author_date(
        &self,
        title: &str,
        author: &str,
        date: NaiveDate,
    ) -> Result<Vec<Article>>;
    async fn count(&self) -> Result<u64>;
}

/// Comparison form for title/author matching: trimmed, lowercased, internal
/// whitespace collapsed. Applied to both sides of a lookup.
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
