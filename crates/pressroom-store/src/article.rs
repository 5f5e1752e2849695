use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical stored record for one ingested article or podcast episode.
///
/// `original_url` is globally unique among non-empty values; offline imports
/// may carry an empty URL until a later extraction backfills it.
/// `body_file` / `body_file_zh` are corpus-relative locators
/// (`en/...` / `zh/...`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: Uuid,
    pub title: String,
    pub title_zh: Option<String>,
    pub date: NaiveDate,
    pub category: String,
    pub author: String,
    pub source: String,
    pub original_url: String,
    pub body_file: String,
    pub body_file_zh: Option<String>,
    /// Set for records created through manual URL submission.
    pub starred: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
