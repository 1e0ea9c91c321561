//! Vector index trait for nearest neighbor search
//!
//! Abstracts over the two index implementations (HNSW, Flat) so the
//! indexing and query services can select one at runtime.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which index implementation to build or query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexKind {
    #[serde(rename = "HNSW")]
    Hnsw,
    #[serde(rename = "FLAT")]
    Flat,
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKind::Hnsw => write!(f, "HNSW"),
            IndexKind::Flat => write!(f, "FLAT"),
        }
    }
}

impl FromStr for IndexKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HNSW" => Ok(IndexKind::Hnsw),
            "FLAT" => Ok(IndexKind::Flat),
            other => Err(format!("unsupported index type: {other}")),
        }
    }
}

/// Distance metric for the Flat index. HNSW always uses L2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    L2,
    Euclidean,
    Cosine,
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l2" => Ok(DistanceMetric::L2),
            "euclidean" => Ok(DistanceMetric::Euclidean),
            "cosine" => Ok(DistanceMetric::Cosine),
            other => Err(format!("unsupported distance metric: {other}")),
        }
    }
}

/// Build/query tuning knobs. Serde defaults let API callers pass any
/// subset as the `parameters` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexParams {
    /// Target degree per node per layer (HNSW).
    pub m: usize,
    /// Candidate breadth during construction (HNSW).
    pub ef_construction: usize,
    /// Candidate breadth during query (HNSW).
    pub ef_search: usize,
    /// Level-decay scale mL for the geometric level draw (HNSW).
    pub level_scale: f64,
    /// Fixed RNG seed for level assignment. Unset means entropy; tests set
    /// it to make builds reproducible.
    pub seed: Option<u64>,
    /// Distance metric (Flat only).
    pub distance_metric: DistanceMetric,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            m: 16,
            ef_construction: 200,
            ef_search: 100,
            level_scale: 1.0,
            seed: None,
            distance_metric: DistanceMetric::L2,
        }
    }
}

/// Introspection data returned by `GET /libraries/{id}/index`.
#[derive(Debug, Clone, Serialize)]
pub struct IndexInfo {
    pub kind: IndexKind,
    pub built: bool,
    pub vector_count: usize,
    pub dimensions: usize,
    /// Index-specific fields (HNSW parameters, Flat metric, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("index is not built")]
    NotBuilt,
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("index has no entry point")]
    MissingEntryPoint,
    #[error("index not found at {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt index blob: {0}")]
    Corrupt(String),
    #[error(
        "checksum mismatch for {file}: expected {expected}, got {actual}. Index may be corrupted."
    )]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },
}

/// Trait for vector similarity search indexes.
///
/// Implementations must be thread-safe (`Send + Sync`); searches run on
/// blocking worker threads.
pub trait VectorIndex: Send + Sync {
    /// Build the index from a snapshot of vectors. Position in `vectors`
    /// is the id returned by `search`. Building on an empty snapshot
    /// succeeds and yields an index that returns empty results.
    fn build(&mut self, vectors: Vec<Vec<f32>>, params: &IndexParams) -> Result<(), IndexError>;

    /// k-NN search. Returns `(id, distance)` pairs sorted ascending by
    /// distance, ties broken by smaller id, at most `k` entries.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(u32, f32)>, IndexError>;

    /// Introspection for the info endpoint.
    fn info(&self) -> IndexInfo;

    /// Number of vectors in the index.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn kind(&self) -> IndexKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parses_case_insensitively() {
        assert_eq!("hnsw".parse::<IndexKind>().unwrap(), IndexKind::Hnsw);
        assert_eq!("FLAT".parse::<IndexKind>().unwrap(), IndexKind::Flat);
        assert!("ivf".parse::<IndexKind>().is_err());
    }

    #[test]
    fn test_metric_parses() {
        assert_eq!("l2".parse::<DistanceMetric>().unwrap(), DistanceMetric::L2);
        assert_eq!(
            "COSINE".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Cosine
        );
        assert!("manhattan".parse::<DistanceMetric>().is_err());
    }

    #[test]
    fn test_params_accept_partial_json() {
        let params: IndexParams = serde_json::from_str(r#"{"m": 8, "seed": 42}"#).unwrap();
        assert_eq!(params.m, 8);
        assert_eq!(params.seed, Some(42));
        assert_eq!(params.ef_construction, 200);
        assert_eq!(params.ef_search, 100);
        assert!((params.level_scale - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_kind_display_matches_blob_tag() {
        assert_eq!(IndexKind::Hnsw.to_string(), "HNSW");
        assert_eq!(IndexKind::Flat.to_string(), "FLAT");
    }
}
