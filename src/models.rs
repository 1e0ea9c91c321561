//! Entity and request/response models
//!
//! Two-level namespace: a library owns documents, documents own chunks.
//! Chunks without a document are library-orphans and permitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open key/value metadata attached to every entity.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A collection of documents and chunks sharing one vector space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Library {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a library.
#[derive(Debug, Clone, Deserialize)]
pub struct LibraryCreate {
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub library_id: String,
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a document.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentCreate {
    pub name: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// A piece of text plus an optional embedding; the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub library_id: String,
    pub document_id: Option<String>,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Metadata,
    /// Stable slot in the library's vector array. `None` when the chunk has
    /// no embedding. Never renumbered; deletion tombstones the slot.
    pub vector_index: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating or updating a chunk. When `embedding` is absent the
/// service generates one from `text` via the embedding provider.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkCreate {
    pub text: String,
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub metadata: Metadata,
}

fn default_k() -> usize {
    5
}

/// k-NN query against a library's persisted index.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query_embedding: Vec<f32>,
    #[serde(default = "default_k")]
    pub k: usize,
    pub metadata_filter: Option<Metadata>,
}

/// A single search hit.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Distance from the query to this chunk's vector. Despite the name,
    /// smaller is better; the field is kept as `score` for wire
    /// compatibility.
    pub score: f32,
}

impl Library {
    pub fn new(create: LibraryCreate) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: create.name,
            metadata: create.metadata,
            created_at: Utc::now(),
        }
    }
}

impl Document {
    pub fn new(library_id: &str, create: DocumentCreate) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            library_id: library_id.to_string(),
            name: create.name,
            metadata: create.metadata,
            created_at: Utc::now(),
        }
    }
}
