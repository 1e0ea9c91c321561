//! Document CRUD operations

use sqlx::Row;

use super::{parse_metadata, parse_timestamp, Store, StoreError};
use crate::models::Document;

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Document, StoreError> {
    Ok(Document {
        id: row.get("id"),
        library_id: row.get("library_id"),
        name: row.get("name"),
        metadata: parse_metadata(row.get("metadata"))?,
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

impl Store {
    pub fn insert_document(&self, document: &Document) -> Result<(), StoreError> {
        self.rt.block_on(async {
            sqlx::query(
                "INSERT INTO documents (id, library_id, name, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&document.id)
            .bind(&document.library_id)
            .bind(&document.name)
            .bind(serde_json::to_string(&document.metadata).unwrap_or_else(|_| "{}".into()))
            .bind(document.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    pub fn get_document(
        &self,
        library_id: &str,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        self.rt.block_on(async {
            let row = sqlx::query("SELECT * FROM documents WHERE id = ?1 AND library_id = ?2")
                .bind(id)
                .bind(library_id)
                .fetch_optional(&self.pool)
                .await?;
            row.as_ref().map(document_from_row).transpose()
        })
    }

    pub fn list_documents(&self, library_id: &str) -> Result<Vec<Document>, StoreError> {
        self.rt.block_on(async {
            let rows = sqlx::query("SELECT * FROM documents WHERE library_id = ?1 ORDER BY rowid")
                .bind(library_id)
                .fetch_all(&self.pool)
                .await?;
            rows.iter().map(document_from_row).collect()
        })
    }

    /// Delete a document; its chunks cascade. Returns false when absent.
    pub fn delete_document(&self, library_id: &str, id: &str) -> Result<bool, StoreError> {
        self.rt.block_on(async {
            let result = sqlx::query("DELETE FROM documents WHERE id = ?1 AND library_id = ?2")
                .bind(id)
                .bind(library_id)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        })
    }
}
