//! Chunk lifecycle
//!
//! Creation embeds the text (when the caller did not supply a vector),
//! then takes the library lock to append the vector and insert the record
//! together. The embed call deliberately happens before the lock: it is a
//! remote dependency and must not stall other writers.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use crate::embedder::TextEmbedder;
use crate::error::{require_id, ServiceError};
use crate::locking::LockManager;
use crate::models::{Chunk, ChunkCreate};
use crate::store::Store;
use crate::vectors::{VectorFile, VectorFileError};

#[derive(Clone)]
pub struct ChunkService {
    store: Arc<Store>,
    locks: Arc<LockManager>,
    embedder: Arc<dyn TextEmbedder>,
    data_dir: PathBuf,
}

impl ChunkService {
    pub fn new(
        store: Arc<Store>,
        locks: Arc<LockManager>,
        embedder: Arc<dyn TextEmbedder>,
        data_dir: PathBuf,
    ) -> Self {
        Self {
            store,
            locks,
            embedder,
            data_dir,
        }
    }

    fn vector_file(&self, library_id: &str) -> VectorFile {
        VectorFile::new(&self.data_dir, library_id)
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

    fn require_document(
        &self,
        library_id: &str,
        document_id: Option<&str>,
    ) -> Result<(), ServiceError> {
        if let Some(doc_id) = document_id {
            require_id(doc_id, "document ID")?;
            if self.store.get_document(library_id, doc_id)?.is_none() {
                return Err(ServiceError::not_found(format!(
                    "document not found: {doc_id}"
                )));
            }
        }
        Ok(())
    }

    pub fn create_chunk(
        &self,
        library_id: &str,
        document_id: Option<&str>,
        data: ChunkCreate,
    ) -> Result<Chunk, ServiceError> {
        self.require_library(library_id)?;
        self.require_document(library_id, document_id)?;
        if data.text.trim().is_empty() {
            return Err(ServiceError::validation("chunk text cannot be empty"));
        }

        // Resolve the embedding before taking the lock
        let embedding = match data.embedding {
            Some(e) if !e.is_empty() => e,
            _ => {
                tracing::debug!(library = library_id, "Generating embedding for chunk");
                self.embedder.embed(&data.text)?
            }
        };

        self.locks.with_lock(library_id, || {
            let slot = self
                .vector_file(library_id)
                .append(&embedding)
                .map_err(map_vector_error)?;
            let chunk = Chunk {
                id: uuid::Uuid::new_v4().to_string(),
                library_id: library_id.to_string(),
                document_id: document_id.map(str::to_string),
                text: data.text,
                embedding: Some(embedding),
                metadata: data.metadata,
                vector_index: Some(slot),
                created_at: Utc::now(),
            };
            self.store.insert_chunk(&chunk)?;
            tracing::info!(library = library_id, chunk = %chunk.id, slot, "Chunk created");
            Ok(chunk)
        })
    }

    pub fn get_chunk(&self, library_id: &str, chunk_id: &str) -> Result<Chunk, ServiceError> {
        self.require_library(library_id)?;
        require_id(chunk_id, "chunk ID")?;
        self.store
            .get_chunk(library_id, chunk_id)?
            .ok_or_else(|| ServiceError::not_found(format!("chunk not found: {chunk_id}")))
    }

    pub fn list_chunks(&self, library_id: &str) -> Result<Vec<Chunk>, ServiceError> {
        self.require_library(library_id)?;
        Ok(self.store.list_chunks_by_library(library_id)?)
    }

    pub fn list_chunks_by_document(
        &self,
        library_id: &str,
        document_id: &str,
    ) -> Result<Vec<Chunk>, ServiceError> {
        self.require_library(library_id)?;
        self.require_document(library_id, Some(document_id))?;
        Ok(self.store.list_chunks_by_document(library_id, document_id)?)
    }

    /// Update text, metadata, and embedding. When the text changed and no
    /// embedding was supplied, the text is re-embedded. The vector slot is
    /// never reassigned: a changed embedding overwrites the slot in place,
    /// and a chunk created without an embedding stays slotless.
    pub fn update_chunk(
        &self,
        library_id: &str,
        chunk_id: &str,
        data: ChunkCreate,
    ) -> Result<Chunk, ServiceError> {
        self.require_library(library_id)?;
        require_id(chunk_id, "chunk ID")?;
        if data.text.trim().is_empty() {
            return Err(ServiceError::validation("chunk text cannot be empty"));
        }
        let existing = self
            .store
            .get_chunk(library_id, chunk_id)?
            .ok_or_else(|| ServiceError::not_found(format!("chunk not found: {chunk_id}")))?;

        let embedding = match data.embedding {
            Some(e) if !e.is_empty() => Some(e),
            _ if data.text != existing.text => {
                tracing::debug!(library = library_id, chunk = chunk_id, "Re-embedding chunk");
                Some(self.embedder.embed(&data.text)?)
            }
            _ => existing.embedding.clone(),
        };

        self.locks.with_lock(library_id, || {
            let updated = Chunk {
                text: data.text,
                embedding: embedding.clone(),
                metadata: data.metadata,
                ..existing.clone()
            };
            self.store.update_chunk(&updated)?;

            if let (Some(slot), Some(vector)) = (existing.vector_index, &embedding) {
                if embedding != existing.embedding {
                    self.vector_file(library_id)
                        .overwrite(slot, vector)
                        .map_err(map_vector_error)?;
                }
            }
            tracing::info!(library = library_id, chunk = chunk_id, "Chunk updated");
            Ok(updated)
        })
    }

    /// Delete a chunk. Its vector slot is tombstoned (zeroed), never
    /// compacted; already-built indexes keep serving the old snapshot
    /// until the next build.
    pub fn delete_chunk(&self, library_id: &str, chunk_id: &str) -> Result<(), ServiceError> {
        self.require_library(library_id)?;
        require_id(chunk_id, "chunk ID")?;
        let existing = self
            .store
            .get_chunk(library_id, chunk_id)?
            .ok_or_else(|| ServiceError::not_found(format!("chunk not found: {chunk_id}")))?;

        self.locks.with_lock(library_id, || {
            if let Some(slot) = existing.vector_index {
                self.vector_file(library_id)
                    .tombstone(slot)
                    .map_err(map_vector_error)?;
            }
            self.store.delete_chunk(library_id, chunk_id)?;
            tracing::info!(library = library_id, chunk = chunk_id, "Chunk deleted");
            Ok(())
        })
    }
}

/// Dimension and emptiness problems are caller mistakes (400); everything
/// else is storage failure.
fn map_vector_error(e: VectorFileError) -> ServiceError {
    match e {
        VectorFileError::DimensionMismatch { expected, actual } => ServiceError::validation(
            format!("embedding dimension {actual} does not match library dimension {expected}"),
        ),
        VectorFileError::EmptyVector => {
            ServiceError::validation("embedding cannot be empty")
        }
        other => ServiceError::Vectors(other),
    }
}
