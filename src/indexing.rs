//! Index build orchestration
//!
//! Build path: take the library lock, snapshot the embedded chunks and
//! their vectors in `vector_index` order, run the selected index's build,
//! persist the blob. A failed build writes nothing; searches keep hitting
//! the previous blob.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{require_id, ServiceError};
use crate::flat::FlatIndex;
use crate::hnsw::HnswIndex;
use crate::index::{IndexError, IndexInfo, IndexKind, IndexParams, VectorIndex};
use crate::locking::LockManager;
use crate::persist::{self, IndexBlob};
use crate::store::{Store, StoreError};
use crate::vectors::VectorFile;

#[derive(Clone)]
pub struct IndexingService {
    store: Arc<Store>,
    locks: Arc<LockManager>,
    data_dir: PathBuf,
}

impl IndexingService {
    pub fn new(store: Arc<Store>, locks: Arc<LockManager>, data_dir: PathBuf) -> Self {
        Self {
            store,
            locks,
            data_dir,
        }
    }

    fn require_library(&self, library_id: &str) -> Result<(), ServiceError> {
        require_id(library_id, "library ID")?;
        if self.store.get_library(library_id)?.is_none() {
            return Err(ServiceError::not_found(format!(
                "library not found: {library_id}"
            )));
        }
        Ok(())
    }

    /// Build and persist an index for the library.
    pub fn build(
        &self,
        library_id: &str,
        kind: IndexKind,
        params: &IndexParams,
    ) -> Result<(), ServiceError> {
        tracing::info!(library = library_id, %kind, "Building index");
        self.require_library(library_id)?;

        self.locks.with_lock(library_id, || {
            let vectors = self.snapshot_vectors(library_id)?;
            if vectors.is_empty() {
                return Err(ServiceError::validation(format!(
                    "no vectors found for library: {library_id}"
                )));
            }

            let blob = match kind {
                IndexKind::Hnsw => {
                    let mut index = HnswIndex::new();
                    index.build(vectors, params)?;
                    IndexBlob::from_hnsw(&index)
                }
                IndexKind::Flat => {
                    let mut index = FlatIndex::new();
                    index.build(vectors, params)?;
                    IndexBlob::from_flat(&index)
                }
            };
            persist::save(&self.data_dir, library_id, &blob)?;
            tracing::info!(library = library_id, %kind, "Index built and persisted");
            Ok(())
        })
    }

    /// Snapshot the library's vectors in `vector_index` order. Positions
    /// in the returned array are the element ids the index will hand back,
    /// and the query service maps them onto the same chunk ordering.
    fn snapshot_vectors(&self, library_id: &str) -> Result<Vec<Vec<f32>>, ServiceError> {
        let chunks = self.store.embedded_chunks_by_library(library_id)?;
        let set = VectorFile::new(&self.data_dir, library_id).load()?;
        let mut vectors = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let slot = chunk.vector_index.ok_or_else(|| {
                StoreError::Decode(format!("chunk {} missing vector_index", chunk.id))
            })?;
            vectors.push(set.row(slot)?.to_vec());
        }
        Ok(vectors)
    }

    /// Introspect the persisted index for a library, or `NotFound` when no
    /// blob exists.
    pub fn info(&self, library_id: &str, kind: IndexKind) -> Result<IndexInfo, ServiceError> {
        self.require_library(library_id)?;
        let blob = persist::load(&self.data_dir, library_id, kind).map_err(|e| match e {
            IndexError::NotFound(_) => ServiceError::not_found(format!(
                "no {kind} index found for library: {library_id}"
            )),
            other => ServiceError::Index(other),
        })?;
        Ok(blob.into_index().info())
    }
}
