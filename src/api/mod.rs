//! HTTP surface
//!
//! axum router over the synchronous services. Handlers push service calls
//! onto blocking worker threads; the core algorithms are CPU-bound and run
//! to completion there. Error bodies are `{"error": "<message>"}` with
//! Validation → 400, NotFound → 404, and everything else — dependency
//! failures included — → 500.
//!
//! ## Handler modules
//!
//! - `libraries` / `documents` / `chunks` - catalog CRUD
//! - `indexing` - build (202) and info endpoints
//! - `search` - k-NN queries

mod chunks;
mod documents;
mod indexing;
mod libraries;
mod search;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::catalog::CatalogService;
use crate::chunks::ChunkService;
use crate::config::Config;
use crate::embedder::{CohereEmbedder, DisabledEmbedder, EmbedError, TextEmbedder};
use crate::error::ServiceError;
use crate::indexing::IndexingService;
use crate::locking::LockManager;
use crate::query::QueryService;
use crate::store::Store;

/// Shared state: the services plus the process-wide lock registry they
/// hang off. Built once at startup and cloned into handlers.
pub struct AppState {
    pub catalog: CatalogService,
    pub chunks: ChunkService,
    pub indexing: IndexingService,
    pub query: QueryService,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let store = Arc::new(Store::open(&config.database_path)?);
        let locks = Arc::new(LockManager::new());

        let embedder: Arc<dyn TextEmbedder> = match CohereEmbedder::new(&config.embedding) {
            Ok(client) => Arc::new(client),
            Err(EmbedError::MissingApiKey) => {
                tracing::warn!(
                    "No embedding API key configured; chunk writes must supply embeddings"
                );
                Arc::new(DisabledEmbedder)
            }
            Err(e) => return Err(e.into()),
        };

        let data_dir = config.data_dir.clone();
        Ok(Self {
            catalog: CatalogService::new(store.clone(), data_dir.clone()),
            chunks: ChunkService::new(store.clone(), locks.clone(), embedder, data_dir.clone()),
            indexing: IndexingService::new(store.clone(), locks, data_dir.clone()),
            query: QueryService::new(store, data_dir),
        })
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(%status, "Request failed: {self}");
        } else {
            tracing::debug!(%status, "Request rejected: {self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Run a synchronous service call on the blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServiceError::Internal(format!("worker task failed: {e}")))?
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/libraries",
            post(libraries::create).get(libraries::list),
        )
        .route(
            "/libraries/{library_id}",
            get(libraries::get_one).delete(libraries::delete),
        )
        .route(
            "/libraries/{library_id}/documents",
            post(documents::create).get(documents::list),
        )
        .route(
            "/libraries/{library_id}/documents/{document_id}",
            get(documents::get_one).delete(documents::delete),
        )
        .route(
            "/libraries/{library_id}/chunks",
            post(chunks::create).get(chunks::list),
        )
        .route(
            "/libraries/{library_id}/chunks/{chunk_id}",
            get(chunks::get_one)
                .put(chunks::update)
                .delete(chunks::delete),
        )
        .route(
            "/libraries/{library_id}/index",
            post(indexing::build).get(indexing::info),
        )
        .route("/libraries/{library_id}/search", post(search::search))
        // Vectors in request bodies get large; 16MB leaves headroom
        .layer(RequestBodyLimitLayer::new(16 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Start the HTTP service and block until shutdown.
pub fn serve(config: &Config) -> Result<()> {
    let state = Arc::new(AppState::from_config(config)?);
    let app = router(state);
    let addr = format!("{}:{}", config.bind, config.port);

    tracing::info!(%addr, "vqs listening");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let shutdown = async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        };
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok::<_, anyhow::Error>(())
    })?;
    Ok(())
}

/// Parse the optional `index_type` string shared by the index and search
/// endpoints, defaulting to HNSW as the original API did.
pub(crate) fn parse_index_kind(
    value: Option<&str>,
) -> Result<crate::index::IndexKind, ServiceError> {
    match value {
        None => Ok(crate::index::IndexKind::Hnsw),
        Some(s) => s.parse().map_err(ServiceError::Validation),
    }
}
