//! Search endpoint

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use super::{parse_index_kind, run_blocking, AppState};
use crate::error::ServiceError;
use crate::models::{SearchRequest, SearchResult};

#[derive(Deserialize)]
pub(crate) struct SearchScope {
    index_type: Option<String>,
}

/// `POST /libraries/{id}/search`. Results carry `score` = distance
/// (smaller is better), in the index's ascending order.
pub(crate) async fn search(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<String>,
    Query(scope): Query<SearchScope>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<Vec<SearchResult>>, ServiceError> {
    let kind = parse_index_kind(scope.index_type.as_deref())?;
    let query = state.query.clone();
    Ok(Json(
        run_blocking(move || query.search(&library_id, &body, kind)).await?,
    ))
}
