//! Library endpoints

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use super::{run_blocking, AppState};
use crate::error::ServiceError;
use crate::models::{Library, LibraryCreate};

pub(crate) async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LibraryCreate>,
) -> Result<(StatusCode, Json<Library>), ServiceError> {
    let catalog = state.catalog.clone();
    let library = run_blocking(move || catalog.create_library(body)).await?;
    Ok((StatusCode::CREATED, Json(library)))
}

pub(crate) async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Library>>, ServiceError> {
    let catalog = state.catalog.clone();
    Ok(Json(run_blocking(move || catalog.list_libraries()).await?))
}

pub(crate) async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<String>,
) -> Result<Json<Library>, ServiceError> {
    let catalog = state.catalog.clone();
    Ok(Json(
        run_blocking(move || catalog.get_library(&library_id)).await?,
    ))
}

pub(crate) async fn delete(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    let catalog = state.catalog.clone();
    run_blocking(move || catalog.delete_library(&library_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
