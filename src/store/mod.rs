//! SQLite storage for libraries, documents, and chunks (sqlx async with
//! sync wrappers)
//!
//! Provides sync methods that internally use a tokio runtime to execute
//! async sqlx operations, so the services stay synchronous while keeping
//! sqlx's pooling and WAL support. Vector payloads live in the per-library
//! vector files; the database keeps each chunk's `vector_index` slot.
//!
//! ## Module structure
//!
//! - `libraries` - library CRUD
//! - `documents` - document CRUD
//! - `chunks` - chunk CRUD plus the vector-index snapshot queries

mod chunks;
mod documents;
mod libraries;

use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::runtime::Runtime;

/// Current database schema version, stored in the `metadata` table.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Runtime error: {0}")]
    Runtime(String),
    #[error("Invalid stored data: {0}")]
    Decode(String),
    #[error("Schema version mismatch: database is v{0}, this build expects v{1}")]
    SchemaMismatch(i32, i32),
    #[error("Database created by a newer vqs (schema v{0}). Please upgrade.")]
    SchemaNewer(i32),
}

/// Thread-safe SQLite store for the record catalog.
///
/// Uses sqlx connection pooling and WAL mode for concurrent reads. All
/// methods take `&self` and are safe to call from multiple threads; write
/// ordering within a library comes from the caller-held library lock, not
/// from the store.
pub struct Store {
    pub(crate) pool: SqlitePool,
    pub(crate) rt: Runtime,
}

impl Store {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let rt = Runtime::new().map_err(|e| StoreError::Runtime(e.to_string()))?;

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        // Forward slashes for URL compatibility on Windows
        let path_str = path.to_string_lossy().replace('\\', "/");
        let db_url = format!("sqlite://{path_str}?mode=rwc");

        let pool = rt.block_on(async {
            SqlitePoolOptions::new()
                .max_connections(4)
                .after_connect(|conn, _meta| {
                    Box::pin(async move {
                        // Foreign keys are off by default in SQLite
                        sqlx::query("PRAGMA foreign_keys = ON")
                            .execute(&mut *conn)
                            .await?;
                        // WAL: concurrent reads, single writer
                        sqlx::query("PRAGMA journal_mode = WAL")
                            .execute(&mut *conn)
                            .await?;
                        sqlx::query("PRAGMA busy_timeout = 5000")
                            .execute(&mut *conn)
                            .await?;
                        sqlx::query("PRAGMA synchronous = NORMAL")
                            .execute(&mut *conn)
                            .await?;
                        Ok(())
                    })
                })
                .connect(&db_url)
                .await
        })?;

        let store = Self { pool, rt };
        store.init_schema()?;
        store.check_schema_version()?;

        tracing::info!(path = %path.display(), "Database connected");
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        self.rt.block_on(async {
            let statements = [
                "CREATE TABLE IF NOT EXISTS metadata (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                )",
                "CREATE TABLE IF NOT EXISTS libraries (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    metadata TEXT NOT NULL DEFAULT '{}',
                    created_at TEXT NOT NULL
                )",
                "CREATE TABLE IF NOT EXISTS documents (
                    id TEXT PRIMARY KEY,
                    library_id TEXT NOT NULL REFERENCES libraries(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    metadata TEXT NOT NULL DEFAULT '{}',
                    created_at TEXT NOT NULL
                )",
                "CREATE TABLE IF NOT EXISTS chunks (
                    id TEXT PRIMARY KEY,
                    library_id TEXT NOT NULL REFERENCES libraries(id) ON DELETE CASCADE,
                    document_id TEXT REFERENCES documents(id) ON DELETE CASCADE,
                    text TEXT NOT NULL,
                    embedding BLOB,
                    metadata TEXT NOT NULL DEFAULT '{}',
                    vector_index INTEGER,
                    created_at TEXT NOT NULL
                )",
                "CREATE INDEX IF NOT EXISTS idx_documents_library ON documents(library_id)",
                "CREATE INDEX IF NOT EXISTS idx_chunks_library ON chunks(library_id)",
                "CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id)",
            ];
            for stmt in statements {
                sqlx::query(stmt).execute(&self.pool).await?;
            }
            sqlx::query(
                "INSERT OR IGNORE INTO metadata (key, value) VALUES ('schema_version', ?1)",
            )
            .bind(CURRENT_SCHEMA_VERSION.to_string())
            .execute(&self.pool)
            .await?;
            Ok(())
        })
    }

    fn check_schema_version(&self) -> Result<(), StoreError> {
        let stored: Option<(String,)> = self.rt.block_on(async {
            sqlx::query_as("SELECT value FROM metadata WHERE key = 'schema_version'")
                .fetch_optional(&self.pool)
                .await
        })?;
        let version = stored
            .and_then(|(v,)| v.parse::<i32>().ok())
            .unwrap_or(CURRENT_SCHEMA_VERSION);
        if version > CURRENT_SCHEMA_VERSION {
            return Err(StoreError::SchemaNewer(version));
        }
        if version < CURRENT_SCHEMA_VERSION {
            return Err(StoreError::SchemaMismatch(version, CURRENT_SCHEMA_VERSION));
        }
        Ok(())
    }
}

/// Encode an embedding as little-endian f32 bytes for BLOB storage.
pub(crate) fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    bytemuck::cast_slice(embedding).to_vec()
}

/// Decode a BLOB back into an embedding.
pub(crate) fn bytes_to_embedding(bytes: &[u8]) -> Result<Vec<f32>, StoreError> {
    if bytes.len() % 4 != 0 {
        return Err(StoreError::Decode(format!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytemuck::pod_collect_to_vec(bytes))
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("bad timestamp '{s}': {e}")))
}

pub(crate) fn parse_metadata(s: &str) -> Result<crate::models::Metadata, StoreError> {
    serde_json::from_str(s).map_err(|e| StoreError::Decode(format!("bad metadata: {e}")))
}
