//! Document endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::{run_blocking, AppState};
use crate::error::ServiceError;
use crate::models::{Document, DocumentCreate};

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<String>,
    Json(body): Json<DocumentCreate>,
) -> Result<(StatusCode, Json<Document>), ServiceError> {
    let catalog = state.catalog.clone();
    let document = run_blocking(move || catalog.create_document(&library_id, body)).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<String>,
) -> Result<Json<Vec<Document>>, ServiceError> {
    let catalog = state.catalog.clone();
    Ok(Json(
        run_blocking(move || catalog.list_documents(&library_id)).await?,
    ))
}

pub(crate) async fn get_one(
    State(state): State<Arc<AppState>>,
    Path((library_id, document_id)): Path<(String, String)>,
) -> Result<Json<Document>, ServiceError> {
    let catalog = state.catalog.clone();
    Ok(Json(
        run_blocking(move || catalog.get_document(&library_id, &document_id)).await?,
    ))
}

pub(crate) async fn delete(
    State(state): State<Arc<AppState>>,
    Path((library_id, document_id)): Path<(String, String)>,
) -> Result<StatusCode, ServiceError> {
    let catalog = state.catalog.clone();
    run_blocking(move || catalog.delete_document(&library_id, &document_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
