//! Chunk CRUD operations and vector-index snapshot queries

use sqlx::Row;

use super::{
    bytes_to_embedding, embedding_to_bytes, parse_metadata, parse_timestamp, Store, StoreError,
};
use crate::models::Chunk;

fn chunk_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Chunk, StoreError> {
    let embedding: Option<Vec<u8>> = row.get("embedding");
    let vector_index: Option<i64> = row.get("vector_index");
    Ok(Chunk {
        id: row.get("id"),
        library_id: row.get("library_id"),
        document_id: row.get("document_id"),
        text: row.get("text"),
        embedding: embedding.as_deref().map(bytes_to_embedding).transpose()?,
        metadata: parse_metadata(row.get("metadata"))?,
        vector_index: vector_index.map(|v| v as u32),
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

impl Store {
    pub fn insert_chunk(&self, chunk: &Chunk) -> Result<(), StoreError> {
        self.rt.block_on(async {
            sqlx::query(
                "INSERT INTO chunks
                 (id, library_id, document_id, text, embedding, metadata, vector_index, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .bind(&chunk.id)
            .bind(&chunk.library_id)
            .bind(&chunk.document_id)
            .bind(&chunk.text)
            .bind(chunk.embedding.as_deref().map(embedding_to_bytes))
            .bind(serde_json::to_string(&chunk.metadata).unwrap_or_else(|_| "{}".into()))
            .bind(chunk.vector_index.map(|v| v as i64))
            .bind(chunk.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    pub fn get_chunk(&self, library_id: &str, id: &str) -> Result<Option<Chunk>, StoreError> {
        self.rt.block_on(async {
            let row = sqlx::query("SELECT * FROM chunks WHERE id = ?1 AND library_id = ?2")
                .bind(id)
                .bind(library_id)
                .fetch_optional(&self.pool)
                .await?;
            row.as_ref().map(chunk_from_row).transpose()
        })
    }

    /// All chunks of a library in insertion order.
    pub fn list_chunks_by_library(&self, library_id: &str) -> Result<Vec<Chunk>, StoreError> {
        self.rt.block_on(async {
            let rows = sqlx::query("SELECT * FROM chunks WHERE library_id = ?1 ORDER BY rowid")
                .bind(library_id)
                .fetch_all(&self.pool)
                .await?;
            rows.iter().map(chunk_from_row).collect()
        })
    }

    pub fn list_chunks_by_document(
        &self,
        library_id: &str,
        document_id: &str,
    ) -> Result<Vec<Chunk>, StoreError> {
        self.rt.block_on(async {
            let rows = sqlx::query(
                "SELECT * FROM chunks WHERE library_id = ?1 AND document_id = ?2 ORDER BY rowid",
            )
            .bind(library_id)
            .bind(document_id)
            .fetch_all(&self.pool)
            .await?;
            rows.iter().map(chunk_from_row).collect()
        })
    }

    /// Chunks holding a vector slot, ordered by `vector_index`. This is the
    /// snapshot order shared by index builds and query-result mapping: the
    /// position of a chunk in this list is the element id inside the index.
    pub fn embedded_chunks_by_library(&self, library_id: &str) -> Result<Vec<Chunk>, StoreError> {
        self.rt.block_on(async {
            let rows = sqlx::query(
                "SELECT * FROM chunks
                 WHERE library_id = ?1 AND vector_index IS NOT NULL
                 ORDER BY vector_index",
            )
            .bind(library_id)
            .fetch_all(&self.pool)
            .await?;
            rows.iter().map(chunk_from_row).collect()
        })
    }

    /// The vector slot assigned to a chunk, if any.
    pub fn vector_index_of(&self, chunk_id: &str) -> Result<Option<u32>, StoreError> {
        self.rt.block_on(async {
            let row: Option<(Option<i64>,)> =
                sqlx::query_as("SELECT vector_index FROM chunks WHERE id = ?1")
                    .bind(chunk_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row.and_then(|(v,)| v).map(|v| v as u32))
        })
    }

    /// Update a chunk's text, embedding, and metadata. The vector slot is
    /// immutable and deliberately not touched here.
    pub fn update_chunk(&self, chunk: &Chunk) -> Result<(), StoreError> {
        self.rt.block_on(async {
            sqlx::query(
                "UPDATE chunks SET text = ?1, embedding = ?2, metadata = ?3
                 WHERE id = ?4 AND library_id = ?5",
            )
            .bind(&chunk.text)
            .bind(chunk.embedding.as_deref().map(embedding_to_bytes))
            .bind(serde_json::to_string(&chunk.metadata).unwrap_or_else(|_| "{}".into()))
            .bind(&chunk.id)
            .bind(&chunk.library_id)
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    /// Delete a chunk record. Returns false when absent.
    pub fn delete_chunk(&self, library_id: &str, id: &str) -> Result<bool, StoreError> {
        self.rt.block_on(async {
            let result = sqlx::query("DELETE FROM chunks WHERE id = ?1 AND library_id = ?2")
                .bind(id)
                .bind(library_id)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        })
    }
}
