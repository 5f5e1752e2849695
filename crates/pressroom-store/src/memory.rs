//! In-memory store used by tests and offline tooling. Mirrors the SQLite
//! backend's constraints, including URL uniqueness.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use pressroom_common::{normalize_url, PressroomError, Result};

use crate::article::Article;
use crate::repository::{normalize_text, ArticleStore};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HashMap<Uuid, Article>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArticleStore for MemoryStore {
    async fn insert(&self, article: &Article) -> Result<()> {
        let mut map = self.inner.write().await;
        if !article.original_url.is_empty()
            && map
                .values()
                .any(|a| a.original_url == article.original_url)
        {
            return Err(PressroomError::Conflict(format!(
                "url already stored: {}",
                article.original_url
            )));
        }
        map.insert(article.id, article.clone());
        Ok(())
    }

    async fn update(&self, article: &Article) -> Result<()> {
        let mut map = self.inner.write().await;
        if !map.contains_key(&article.id) {
            return Err(PressroomError::Conflict(format!(
                "update of unknown article: {}",
                article.id
            )));
        }
        map.insert(article.id, article.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>> {
        Ok(self.inner.read().await.get(&id).cloned())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Article>> {
        if url.is_empty() {
            return Ok(None);
        }
        Ok(self
            .inner
            .read()
            .await
            .values()
            .find(|a| a.original_url == url)
            .cloned())
    }

    async fn find_by_normalized_url(&self, normalized: &str) -> Result<Vec<Article>> {
        if normalized.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .inner
            .read()
            .await
            .values()
            .filter(|a| {
                !a.original_url.is_empty() && normalize_url(&a.original_url) == normalized
            })
            .cloned()
            .collect())
    }

    async fn find_by_body_file(&self, body_file: &str) -> Result<Option<Article>> {
        if body_file.is_empty() {
            return Ok(None);
        }
        Ok(self
            .inner
            .read()
            .await
            .values()
            .find(|a| a.body_file == body_file)
            .cloned())
    }

    async fn find_by_title_author_date(
        &self,
        title: &str,
        author: &str,
        date: NaiveDate,
    ) -> Result<Vec<Article>> {
        let title = normalize_text(title);
        let author = normalize_text(author);
        Ok(self
            .inner
            .read()
            .await
            .values()
            .filter(|a| {
                a.date == date
                    && normalize_text(&a.title) == title
                    && normalize_text(&a.author) == author
            })
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.inner.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn sample(url: &str, body_file: &str) -> Article {
        let now = Utc::now();
        Article {
            id: Uuid::new_v4(),
            title: "A Quiet Mind".to_string(),
            title_zh: None,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            category: "culture".to_string(),
            author: "Jo Field".to_string(),
            source: "Aeon".to_string(),
            original_url: url.to_string(),
            body_file: body_file.to_string(),
            body_file_zh: None,
            starred: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_url() {
        let store = MemoryStore::new();
        store
            .insert(&sample("https://aeon.co/essays/a", "en/a.html"))
            .await
            .unwrap();
        let err = store
            .insert(&sample("https://aeon.co/essays/a", "en/b.html"))
            .await
            .unwrap_err();
        assert!(matches!(err, PressroomError::Conflict(_)));
    }

    #[tokio::test]
    async fn empty_urls_do_not_collide() {
        let store = MemoryStore::new();
        store.insert(&sample("", "en/a.html")).await.unwrap();
        store.insert(&sample("", "en/b.html")).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn title_author_date_lookup_is_case_insensitive() {
        let store = MemoryStore::new();
        let a = sample("https://aeon.co/essays/a", "en/a.html");
        store.insert(&a).await.unwrap();
        let hits = store
            .find_by_title_author_date("a quiet  MIND", "JO FIELD", a.date)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, a.id);
    }
}
