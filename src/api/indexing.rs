//! Index build and introspection endpoints

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::{parse_index_kind, run_blocking, AppState};
use crate::error::ServiceError;
use crate::index::{IndexInfo, IndexParams};

#[derive(Deserialize)]
pub(crate) struct BuildRequest {
    index_type: Option<String>,
    /// Index tuning knobs; absent fields take defaults.
    parameters: Option<IndexParams>,
}

#[derive(Deserialize)]
pub(crate) struct IndexTypeQuery {
    index_type: Option<String>,
}

/// `POST /libraries/{id}/index` → 202. The build runs to completion on a
/// blocking worker before the response; 202 is kept for wire compatibility
/// with the original API.
pub(crate) async fn build(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<String>,
    Json(body): Json<BuildRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ServiceError> {
    let kind = parse_index_kind(body.index_type.as_deref())?;
    let params = body.parameters.unwrap_or_default();
    let indexing = state.indexing.clone();
    let message = {
        let library_id = library_id.clone();
        run_blocking(move || {
            indexing.build(&library_id, kind, &params)?;
            Ok(format!("Index building started for library: {library_id}"))
        })
        .await?
    };
    Ok((StatusCode::ACCEPTED, Json(json!({ "message": message }))))
}

/// `GET /libraries/{id}/index?index_type=…` → info or 404.
pub(crate) async fn info(
    State(state): State<Arc<AppState>>,
    Path(library_id): Path<String>,
    Query(query): Query<IndexTypeQuery>,
) -> Result<Json<IndexInfo>, ServiceError> {
    let kind = parse_index_kind(query.index_type.as_deref())?;
    let indexing = state.indexing.clone();
    Ok(Json(
        run_blocking(move || indexing.info(&library_id, kind)).await?,
    ))
}
