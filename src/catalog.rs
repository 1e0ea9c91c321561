//! Library and document lifecycle
//!
//! Thin orchestration over the record store: identifier validation, parent
//! existence checks, and cleanup of a deleted library's on-disk artifacts.

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{require_id, ServiceError};
use crate::index::IndexKind;
use crate::models::{Document, DocumentCreate, Library, LibraryCreate};
use crate::persist;
use crate::store::Store;
use crate::vectors::VectorFile;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<Store>,
    data_dir: PathBuf,
}

impl CatalogService {
    pub fn new(store: Arc<Store>, data_dir: PathBuf) -> Self {
        Self { store, data_dir }
    }

    pub fn create_library(&self, create: LibraryCreate) -> Result<Library, ServiceError> {
        if create.name.trim().is_empty() {
            return Err(ServiceError::validation("library name cannot be empty"));
        }
        let library = Library::new(create);
        self.store.insert_library(&library)?;
        tracing::info!(library = %library.id, "Library created");
        Ok(library)
    }

    pub fn get_library(&self, id: &str) -> Result<Library, ServiceError> {
        require_id(id, "library ID")?;
        self.store
            .get_library(id)?
            .ok_or_else(|| ServiceError::not_found(format!("library not found: {id}")))
    }

    pub fn list_libraries(&self) -> Result<Vec<Library>, ServiceError> {
        Ok(self.store.list_libraries()?)
    }

    /// Delete a library, its records (cascade), and its on-disk vector
    /// file and index blobs.
    pub fn delete_library(&self, id: &str) -> Result<(), ServiceError> {
        require_id(id, "library ID")?;
        if !self.store.delete_library(id)? {
            return Err(ServiceError::not_found(format!("library not found: {id}")));
        }
        VectorFile::new(&self.data_dir, id).remove()?;
        for kind in [IndexKind::Hnsw, IndexKind::Flat] {
            let path = persist::blob_path(&self.data_dir, id, kind);
            if path.exists() {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::warn!(path = %path.display(), "Failed to remove index blob: {e}");
                }
            }
        }
        tracing::info!(library = id, "Library deleted");
        Ok(())
    }

    pub fn create_document(
        &self,
        library_id: &str,
        create: DocumentCreate,
    ) -> Result<Document, ServiceError> {
        require_id(library_id, "library ID")?;
        if create.name.trim().is_empty() {
            return Err(ServiceError::validation("document name cannot be empty"));
        }
        self.get_library(library_id)?;
        let document = Document::new(library_id, create);
        self.store.insert_document(&document)?;
        tracing::info!(library = library_id, document = %document.id, "Document created");
        Ok(document)
    }

    pub fn get_document(&self, library_id: &str, id: &str) -> Result<Document, ServiceError> {
        require_id(library_id, "library ID")?;
        require_id(id, "document ID")?;
        self.get_library(library_id)?;
        self.store
            .get_document(library_id, id)?
            .ok_or_else(|| ServiceError::not_found(format!("document not found: {id}")))
    }

    pub fn list_documents(&self, library_id: &str) -> Result<Vec<Document>, ServiceError> {
        require_id(library_id, "library ID")?;
        self.get_library(library_id)?;
        Ok(self.store.list_documents(library_id)?)
    }

    pub fn delete_document(&self, library_id: &str, id: &str) -> Result<(), ServiceError> {
        require_id(library_id, "library ID")?;
        require_id(id, "document ID")?;
        self.get_library(library_id)?;
        if !self.store.delete_document(library_id, id)? {
            return Err(ServiceError::not_found(format!("document not found: {id}")));
        }
        tracing::info!(library = library_id, document = id, "Document deleted");
        Ok(())
    }
}
