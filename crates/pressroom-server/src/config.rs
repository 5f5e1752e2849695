//! Service configuration: `pressroom.toml` (path overridable via
//! `PRESSROOM_CONFIG`) with environment overrides on top. Every field has a
//! default so the service runs with no config file at all.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use pressroom_ingest::QueueConfig;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorpusConfig {
    /// Root directory holding the `en/` and `zh/` body files.
    #[serde(default = "default_corpus_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct IngestionConfig {
    /// Source (and category) fallback for records whose origin is unknown.
    #[serde(default = "default_source")]
    pub default_source: String,
    #[serde(default = "default_timeout_secs")]
    pub default_timeout_secs: u64,
    #[serde(default = "default_media_timeout_secs")]
    pub media_timeout_secs: u64,
    #[serde(default = "default_settle_secs")]
    pub recovery_settle_secs: u64,
    /// `None` disables the periodic sweep; the startup sweep always runs.
    #[serde(default = "default_recovery_interval_secs")]
    pub recovery_interval_secs: Option<u64>,
    /// Transcription backend credential, env-only in practice.
    #[serde(default)]
    pub gemini_api_key: Option<SecretString>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_database_url() -> String {
    "sqlite://data/articles.db".to_string()
}
fn default_corpus_dir() -> PathBuf {
    PathBuf::from("data/html")
}
fn default_source() -> String {
    "The New Yorker".to_string()
}
fn default_timeout_secs() -> u64 {
    600
}
fn default_media_timeout_secs() -> u64 {
    3600
}
fn default_settle_secs() -> u64 {
    5
}
fn default_recovery_interval_secs() -> Option<u64> {
    Some(24 * 60 * 60)
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            dir: default_corpus_dir(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            default_source: default_source(),
            default_timeout_secs: default_timeout_secs(),
            media_timeout_secs: default_media_timeout_secs(),
            recovery_settle_secs: default_settle_secs(),
            recovery_interval_secs: default_recovery_interval_secs(),
            gemini_api_key: None,
        }
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("PRESSROOM_CONFIG").unwrap_or_else(|_| "pressroom.toml".to_string());
        let mut config: Config = match std::fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw)?,
            Err(_) => Config::default(),
        };

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }
        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port.parse()?;
        }
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            config.ingestion.gemini_api_key = Some(SecretString::from(key));
        }
        Ok(config)
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            default_budget: Duration::from_secs(self.ingestion.default_timeout_secs),
            media_budget: Duration::from_secs(self.ingestion.media_timeout_secs),
            corpus_dir: self.corpus.dir.clone(),
            ..QueueConfig::default()
        }
    }

    pub fn recovery_settle(&self) -> Duration {
        Duration::from_secs(self.ingestion.recovery_settle_secs)
    }

    pub fn recovery_interval(&self) -> Option<Duration> {
        self.ingestion.recovery_interval_secs.map(Duration::from_secs)
    }
}
