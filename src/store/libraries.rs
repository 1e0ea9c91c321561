//! Library CRUD operations

use sqlx::Row;

use super::{parse_metadata, parse_timestamp, Store, StoreError};
use crate::models::Library;

fn library_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Library, StoreError> {
    Ok(Library {
        id: row.get("id"),
        name: row.get("name"),
        metadata: parse_metadata(row.get("metadata"))?,
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

impl Store {
    pub fn insert_library(&self, library: &Library) -> Result<(), StoreError> {
        self.rt.block_on(async {
            sqlx::query(
                "INSERT INTO libraries (id, name, metadata, created_at) VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&library.id)
            .bind(&library.name)
            .bind(serde_json::to_string(&library.metadata).unwrap_or_else(|_| "{}".into()))
            .bind(library.created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    pub fn get_library(&self, id: &str) -> Result<Option<Library>, StoreError> {
        self.rt.block_on(async {
            let row = sqlx::query("SELECT * FROM libraries WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            row.as_ref().map(library_from_row).transpose()
        })
    }

    pub fn list_libraries(&self) -> Result<Vec<Library>, StoreError> {
        self.rt.block_on(async {
            let rows = sqlx::query("SELECT * FROM libraries ORDER BY rowid")
                .fetch_all(&self.pool)
                .await?;
            rows.iter().map(library_from_row).collect()
        })
    }

    /// Delete a library; documents and chunks cascade. Returns false when
    /// the library did not exist.
    pub fn delete_library(&self, id: &str) -> Result<bool, StoreError> {
        self.rt.block_on(async {
            let result = sqlx::query("DELETE FROM libraries WHERE id = ?1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            Ok(result.rows_affected() > 0)
        })
    }
}
