//! Thin JSON API: URL submission, job-status polling and article lookup.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use pressroom_common::PressroomError;
use pressroom_ingest::IngestionQueue;
use pressroom_store::ArticleStore;

pub struct AppState {
    pub queue: Arc<IngestionQueue>,
    pub store: Arc<dyn ArticleStore>,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Ingestion(PressroomError),
}

impl From<PressroomError> for ApiError {
    fn from(e: PressroomError) -> Self {
        Self::Ingestion(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Ingestion(e) => {
                let status = match &e {
                    PressroomError::NoExtractor(_) => StatusCode::BAD_REQUEST,
                    PressroomError::Conflict(_) => StatusCode::CONFLICT,
                    PressroomError::ExtractionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub url: String,
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// POST /api/articles/add-from-url - enqueue an ingestion job.
pub async fn submit_url(
    State(state): State<SharedState>,
    Json(req): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let job_id = state.queue.submit(&req.url).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "job_id": job_id, "status": "queued" })),
    ))
}

/// GET /api/jobs/{id} - status of a queued, running or recently finished job.
pub async fn job_status(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    match state.queue.job(id).await {
        Some(job) => Ok(Json(job)),
        None => Err(ApiError::NotFound(format!("no job {id}"))),
    }
}

/// GET /api/articles/{id} - a single archived record.
pub async fn article_detail(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    match state.store.find_by_id(id).await.map_err(ApiError::from)? {
        Some(article) => Ok(Json(article)),
        None => Err(ApiError::NotFound(format!("no article {id}"))),
    }
}

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let shared: SharedState = Arc::new(state);

    Router::new()
        .route("/health", get(health))
        .route("/api/articles/add-from-url", post(submit_url))
        .route("/api/articles/{id}", get(article_detail))
        .route("/api/jobs/{id}", get(job_status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

#[cfg(test)]
mod tests {
    use super::*;

    use pressroom_common::FetchClient;
    use pressroom_extract::Registry;
    use pressroom_ingest::{QueueConfig, Reconciler};
    use pressroom_store::MemoryStore;

    fn shared_state(corpus: &tempfile::TempDir) -> SharedState {
        let store = Arc::new(MemoryStore::new());
        let reconciler = Arc::new(Reconciler::new(store.clone()));
        let registry = Arc::new(Registry::with_default_sources(None));
        let queue = IngestionQueue::new(
            registry,
            reconciler,
            FetchClient::without_delays().unwrap(),
            QueueConfig {
                corpus_dir: corpus.path().to_path_buf(),
                ..QueueConfig::default()
            },
        );
        Arc::new(AppState { queue, store })
    }

    #[tokio::test]
    async fn unsupported_urls_map_to_bad_request() {
        let corpus = tempfile::tempdir().unwrap();
        let state = shared_state(&corpus);
        let err = submit_url(
            State(state),
            Json(SubmitRequest {
                url: "https://elsewhere.test/a".to_string(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_ids_map_to_not_found() {
        let corpus = tempfile::tempdir().unwrap();
        let state = shared_state(&corpus);
        let err = job_status(State(state.clone()), Path(Uuid::new_v4()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = article_detail(State(state), Path(Uuid::new_v4()))
            .await
            .err()
            .unwrap();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
