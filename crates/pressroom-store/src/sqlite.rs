//! SQLite backend. Schema is created on open; the normalized URL is stored
//! as its own indexed column so the second match strategy stays a plain
//! equality lookup.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use pressroom_common::{normalize_url, PressroomError, Result};

use crate::article::Article;
use crate::repository::{normalize_text, ArticleStore};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS articles (
        id             TEXT PRIMARY KEY,
        title          TEXT NOT NULL,
        title_zh       TEXT,
        date           TEXT NOT NULL,
        category       TEXT NOT NULL,
        author         TEXT NOT NULL,
        source         TEXT NOT NULL,
        original_url   TEXT NOT NULL,
        normalized_url TEXT NOT NULL,
        body_file      TEXT NOT NULL,
        body_file_zh   TEXT,
        starred        INTEGER NOT NULL DEFAULT 0,
        created_at     TEXT NOT NULL,
        updated_at     TEXT NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_articles_original_url
        ON articles(original_url) WHERE original_url <> ''",
    "CREATE INDEX IF NOT EXISTS idx_articles_normalized_url
        ON articles(normalized_url)",
    "CREATE INDEX IF NOT EXISTS idx_articles_body_file
        ON articles(body_file)",
];

#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating the file and schema if needed) a store at the given
    /// sqlx connection URL, e.g. `sqlite://data/articles.db`.
    pub async fn open(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        let store = Self { pool };
        store.migrate().await?;
        info!(url = %url, "article store opened");
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    Ok(Article {
        id: row.try_get::<Uuid, _>("id")?,
        title: row.try_get("title")?,
        title_zh: row.try_get("title_zh")?,
        date: row.try_get::<NaiveDate, _>("date")?,
        category: row.try_get("category")?,
        author: row.try_get("author")?,
        source: row.try_get("source")?,
        original_url: row.try_get("original_url")?,
        body_file: row.try_get("body_file")?,
        body_file_zh: row.try_get("body_file_zh")?,
        starred: row.try_get("starred")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

fn map_unique_violation(e: sqlx::Error, url: &str) -> PressroomError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => {
            PressroomError::Conflict(format!("url already stored: {url}"))
        }
        _ => PressroomError::Store(e),
    }
}

#[async_trait]
impl ArticleStore for SqliteStore {
    async fn insert(&self, article: &Article) -> Result<()> {
        sqlx::query(
            "INSERT INTO articles
             (id, title, title_zh, date, category, author, source,
              original_url, normalized_url, body_file, body_file_zh,
              starred, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(article.id)
        .bind(&article.title)
        .bind(&article.title_zh)
        .bind(article.date)
        .bind(&article.category)
        .bind(&article.author)
        .bind(&article.source)
        .bind(&article.original_url)
        .bind(normalize_url(&article.original_url))
        .bind(&article.body_file)
        .bind(&article.body_file_zh)
        .bind(article.starred)
        .bind(article.created_at)
        .bind(article.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &article.original_url))?;
        Ok(())
    }

    async fn update(&self, article: &Article) -> Result<()> {
        let done = sqlx::query(
            "UPDATE articles SET
                title = ?, title_zh = ?, date = ?, category = ?, author = ?,
                source = ?, original_url = ?, normalized_url = ?,
                body_file = ?, body_file_zh = ?, starred = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&article.title)
        .bind(&article.title_zh)
        .bind(article.date)
        .bind(&article.category)
        .bind(&article.author)
        .bind(&article.source)
        .bind(&article.original_url)
        .bind(normalize_url(&article.original_url))
        .bind(&article.body_file)
        .bind(&article.body_file_zh)
        .bind(article.starred)
        .bind(article.updated_at)
        .bind(article.id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &article.original_url))?;

        if done.rows_affected() == 0 {
            return Err(PressroomError::Conflict(format!(
                "update of unknown article: {}",
                article.id
            )));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Article>> {
        let row = sqlx::query("SELECT * FROM articles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_article).transpose()
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<Article>> {
        if url.is_empty() {
            return Ok(None);
        }
        let row = sqlx::query("SELECT * FROM articles WHERE original_url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_article).transpose()
    }

    async fn find_by_normalized_url(&self, normalized: &str) -> Result<Vec<Article>> {
        if normalized.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT * FROM articles WHERE normalized_url = ? AND normalized_url <> ''",
        )
        .bind(normalized)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_article).collect()
    }

    async fn find_by_body_file(&self, body_file: &str) -> Result<Option<Article>> {
        if body_file.is_empty() {
            return Ok(None);
        }
        let row = sqlx::query("SELECT * FROM articles WHERE body_file = ?")
            .bind(body_file)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_article).transpose()
    }

    async fn find_by_title_author_date(
        &self,
        title: &str,
        author: &str,
        date: NaiveDate,
    ) -> Result<Vec<Article>> {
        let rows = sqlx::query(
            "SELECT * FROM articles
             WHERE date = ?
               AND lower(trim(title)) = ?
               AND lower(trim(author)) = ?",
        )
        .bind(date)
        .bind(normalize_text(title))
        .bind(normalize_text(author))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_article).collect()
    }

    async fn count(&self) -> Result<u64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
            .fetch_one(&self.pool)
            .await?;
        Ok(n as u64)
    }
}
