//! Chunk endpoints
//!
//! Chunks attach to a document through the optional `document_id` query
//! parameter; without it they are library-orphans.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{run_blocking, AppState};
use crate::error::ServiceError;
use crate::models::{Chunk, ChunkCreate};

#[derive(Deserialize)]
pub(crate) struct ChunkScope {
    document_id: Option<String>,
}

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<String>,
    Query(scope): Query<ChunkScope>,
    Json(body): Json<ChunkCreate>,
) -> Result<(StatusCode, Json<Chunk>), ServiceError> {
    let chunks = state.chunks.clone();
    let chunk = run_blocking(move || {
        chunks.create_chunk(&library_id, scope.document_id.as_deref(), body)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(chunk)))
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<String>,
    Query(scope): Query<ChunkScope>,
) -> Result<Json<Vec<Chunk>>, ServiceError> {
    let chunks = state.chunks.clone();
    Ok(Json(
        run_blocking(move || match scope.document_id {
            Some(document_id) => chunks.list_chunks_by_document(&library_id, &document_id),
            None => chunks.list_chunks(&library_id),
        })
        .await?,
    ))
}

pub(crate) async fn get_one(
    State(state): State<Arc<AppState>>,
    Path((library_id, chunk_id)): Path<(String, String)>,
) -> Result<Json<Chunk>, ServiceError> {
    let chunks = state.chunks.clone();
    Ok(Json(
        run_blocking(move || chunks.get_chunk(&library_id, &chunk_id)).await?,
    ))
}

pub(crate) async fn update(
    State(state): State<Arc<AppState>>,
    Path((library_id, chunk_id)): Path<(String, String)>,
    Json(body): Json<ChunkCreate>,
) -> Result<Json<Chunk>, ServiceError> {
    let chunks = state.chunks.clone();
    Ok(Json(
        run_blocking(move || chunks.update_chunk(&library_id, &chunk_id, body)).await?,
    ))
}

pub(crate) async fn delete(
    State(state): State<Arc<AppState>>,
    Path((library_id, chunk_id)): Path<(String, String)>,
) -> Result<StatusCode, ServiceError> {
    let chunks = state.chunks.clone();
    run_blocking(move || chunks.delete_chunk(&library_id, &chunk_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
