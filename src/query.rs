//! Query orchestration
//!
//! Query path: load the persisted blob, run k-NN, map element ids onto the
//! chunk snapshot (same `vector_index` ordering the build used), apply the
//! metadata filter, keep the index's ascending-distance order.
//!
//! Reads take no lock: the persisted blob is an immutable snapshot and the
//! vector file is append-only, so a concurrent build simply becomes
//! visible at its atomic rename.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{require_id, ServiceError};
use crate::filter;
use crate::index::{IndexError, IndexKind};
use crate::models::{SearchRequest, SearchResult};
use crate::persist;
use crate::store::Store;

/// Upper bound on `k`, matching the request model's contract.
const MAX_K: usize = 100;

#[derive(Clone)]
pub struct QueryService {
    store: Arc<Store>,
    data_dir: PathBuf,
}

impl QueryService {
    pub fn new(store: Arc<Store>, data_dir: PathBuf) -> Self {
        Self { store, data_dir }
    }

    /// Top-k search over a library's persisted index. The result `score`
    /// is a distance: smaller is better. Requesting exactly `k` and
    /// post-filtering means a metadata filter can return fewer than `k`
    /// rows.
    pub fn search(
        &self,
        library_id: &str,
        request: &SearchRequest,
        kind: IndexKind,
    ) -> Result<Vec<SearchResult>, ServiceError> {
        require_id(library_id, "library ID")?;
        if request.query_embedding.is_empty() {
            return Err(ServiceError::validation("query embedding cannot be empty"));
        }
        if request.k == 0 {
            return Err(ServiceError::validation("k must be greater than 0"));
        }
        if request.k > MAX_K {
            return Err(ServiceError::validation(format!(
                "k must be at most {MAX_K}"
            )));
        }
        if self.store.get_library(library_id)?.is_none() {
            return Err(ServiceError::not_found(format!(
                "library not found: {library_id}"
            )));
        }

        let blob = persist::load(&self.data_dir, library_id, kind).map_err(|e| match e {
            IndexError::NotFound(_) => ServiceError::validation(format!(
                "no {kind} index built for library: {library_id}"
            )),
            other => ServiceError::Index(other),
        })?;
        let index = blob.into_index();

        let hits = index
            .search(&request.query_embedding, request.k)
            .map_err(|e| match e {
                IndexError::DimensionMismatch { expected, actual } => ServiceError::validation(
                    format!("query dimension {actual} does not match index dimension {expected}"),
                ),
                IndexError::NotBuilt => {
                    ServiceError::validation(format!("index for library {library_id} is not built"))
                }
                other => ServiceError::Index(other),
            })?;

        // Chunk snapshot in build order: position == element id
        let chunks = self.store.embedded_chunks_by_library(library_id)?;

        let mut results = Vec::with_capacity(hits.len());
        for (idx, distance) in hits {
            let Some(chunk) = chunks.get(idx as usize) else {
                tracing::warn!(idx, "Index returned element beyond chunk snapshot");
                continue;
            };
            if let Some(filter) = &request.metadata_filter {
                if !filter::matches(&chunk.metadata, filter) {
                    continue;
                }
            }
            results.push(SearchResult {
                chunk: chunk.clone(),
                score: distance,
            });
        }

        tracing::info!(
            library = library_id,
            %kind,
            k = request.k,
            results = results.len(),
            "Search completed"
        );
        Ok(results)
    }
}
