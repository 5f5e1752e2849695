//! Pressroom server: archive ingestion behind a small JSON API.
//!
//! Run with: cargo run -p pressroom-server

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use pressroom_common::FetchClient;
use pressroom_extract::Registry;
use pressroom_ingest::{IngestionQueue, Reconciler, RecoveryScanner};
use pressroom_server::config::Config;
use pressroom_server::routes::{build_router, AppState};
use pressroom_store::{ArticleStore, SqliteStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load()?;

    tokio::fs::create_dir_all(config.corpus.dir.join("en")).await?;
    if let Some(db_path) = config.database.url.strip_prefix("sqlite://") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
    }

    let store: Arc<dyn ArticleStore> = Arc::new(SqliteStore::open(&config.database.url).await?);
    let reconciler = Arc::new(Reconciler::new(store.clone()));

    if config.ingestion.gemini_api_key.is_some() {
        info!("text service credential configured but no backend is wired in, articles archive without translations and podcasts fall back to shownotes");
    }
    let registry = Arc::new(Registry::with_default_sources(None));

    let queue = IngestionQueue::new(
        registry.clone(),
        reconciler.clone(),
        FetchClient::new()?,
        config.queue_config(),
    );

    RecoveryScanner::new(
        reconciler,
        registry,
        config.corpus.dir.clone(),
        config.ingestion.default_source.clone(),
    )
    .with_timing(config.recovery_settle(), config.recovery_interval())
    .spawn();

    let app = build_router(AppState { queue, store });

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!(%addr, "pressroom server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
