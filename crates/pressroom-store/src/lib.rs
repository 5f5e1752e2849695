//! Canonical article records and the storage seam.
//!
//! The ingestion pipeline only ever talks to [`ArticleStore`]; the SQLite
//! backend is the production implementation and [`MemoryStore`] backs tests.

pub mod article;
pub mod memory;
pub mod repository;
pub mod sqlite;

pub use article::Article;
pub use memory::MemoryStore;
pub use repository::{normalize_text, ArticleStore};
pub use sqlite::SqliteStore;
