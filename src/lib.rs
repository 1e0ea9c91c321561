//! # vqs - Vector Query Service
//!
//! A vector database service: text chunks with dense embeddings organized
//! under a two-level namespace (library → document → chunk), per-library
//! approximate-nearest-neighbor indexes, and top-k similarity queries with
//! metadata filtering.
//!
//! ## Features
//!
//! - **HNSW index**: layered proximity graph, probabilistic construction,
//!   seedable for reproducible builds
//! - **Flat index**: exhaustive oracle with selectable metric (l2,
//!   euclidean, cosine)
//! - **Stable vector slots**: append-only per-library vector files;
//!   deletions tombstone, never renumber
//! - **Metadata filtering**: `$eq`/`$ne`/`$gt`/`$gte`/`$lt`/`$lte`/`$in`/
//!   `$nin`/`$contains` predicates over chunk metadata
//! - **Per-library locking**: reentrant lock registry serializes writers,
//!   readers go lock-free against persisted snapshots
//! - **HTTP API**: axum surface over synchronous services
//!
//! ## Quick start
//!
//! ```no_run
//! use vqs::hnsw::HnswIndex;
//! use vqs::index::{IndexParams, VectorIndex};
//!
//! # fn main() -> anyhow::Result<()> {
//! let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]];
//! let mut index = HnswIndex::new();
//! index.build(vectors, &IndexParams::default())?;
//!
//! let hits = index.search(&[0.9, 0.1], 2)?;
//! assert_eq!(hits[0].0, 0); // nearest element id
//! # Ok(())
//! # }
//! ```
//!
//! Scores returned by the query service are distances: smaller is better,
//! despite the field name.

// Public library API modules
pub mod api;
pub mod catalog;
pub mod chunks;
pub mod config;
pub mod embedder;
pub mod error;
pub mod filter;
pub mod flat;
pub mod hnsw;
pub mod index;
pub mod indexing;
pub mod locking;
pub mod models;
pub mod persist;
pub mod query;
pub mod store;
pub mod vectors;

// Internal modules - not part of the public API
pub(crate) mod math;

pub use catalog::CatalogService;
pub use chunks::ChunkService;
pub use config::Config;
pub use embedder::{CohereEmbedder, EmbedError, HashEmbedder, TextEmbedder};
pub use error::ServiceError;
pub use flat::FlatIndex;
pub use hnsw::HnswIndex;
pub use index::{DistanceMetric, IndexInfo, IndexKind, IndexParams, VectorIndex};
pub use indexing::IndexingService;
pub use locking::LockManager;
pub use models::{Chunk, Document, Library, SearchRequest, SearchResult};
pub use query::QueryService;
pub use store::Store;
