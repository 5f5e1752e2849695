use thiserror::Error;

#[derive(Debug, Error)]
pub enum PressroomError {
    #[error("no extractor claims url: {0}")]
    NoExtractor(String),

    #[error("extraction timed out after {budget_secs}s: {url}")]
    ExtractionTimeout { url: String, budget_secs: u64 },

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("reconciliation conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, PressroomError>;
