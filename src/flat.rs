//! Brute-force (Flat) index
//!
//! Exhaustive top-k over the library's vectors. O(1) build, O(N) query.
//! Serves as the correctness oracle for the HNSW tests and as the
//! sensible choice for tiny libraries.

use rayon::prelude::*;

use crate::index::{DistanceMetric, IndexError, IndexInfo, IndexKind, IndexParams, VectorIndex};
use crate::math;

pub struct FlatIndex {
    vectors: Vec<Vec<f32>>,
    dim: usize,
    metric: DistanceMetric,
    built: bool,
}

impl FlatIndex {
    pub fn new() -> Self {
        Self {
            vectors: Vec::new(),
            dim: 0,
            metric: DistanceMetric::L2,
            built: false,
        }
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub(crate) fn from_parts(
        vectors: Vec<Vec<f32>>,
        dim: usize,
        metric: DistanceMetric,
        built: bool,
    ) -> Self {
        Self {
            vectors,
            dim,
            metric,
            built,
        }
    }

    pub(crate) fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub(crate) fn dim(&self) -> usize {
        self.dim
    }

    pub(crate) fn built(&self) -> bool {
        self.built
    }

    fn distance(&self, query: &[f32], row: &[f32]) -> Option<f32> {
        match self.metric {
            DistanceMetric::L2 => math::l2_distance(query, row),
            DistanceMetric::Euclidean => math::euclidean_distance(query, row),
            DistanceMetric::Cosine => math::cosine_distance(query, row),
        }
    }
}

impl Default for FlatIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorIndex for FlatIndex {
    fn build(&mut self, vectors: Vec<Vec<f32>>, params: &IndexParams) -> Result<(), IndexError> {
        tracing::info!(count = vectors.len(), "Building FLAT index");
        let dim = vectors.first().map(|v| v.len()).unwrap_or(0);
        for v in &vectors {
            if v.len() != dim {
                return Err(IndexError::DimensionMismatch {
                    expected: dim,
                    actual: v.len(),
                });
            }
        }
        self.vectors = vectors;
        self.dim = dim;
        self.metric = params.distance_metric;
        self.built = true;
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(u32, f32)>, IndexError> {
        if !self.built {
            return Err(IndexError::NotBuilt);
        }
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dim {
            return Err(IndexError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(u32, f32)> = self
            .vectors
            .par_iter()
            .enumerate()
            .filter_map(|(idx, row)| {
                match self.distance(query, row) {
                    Some(d) => Some((idx as u32, d)),
                    None => {
                        // Zero-norm rows under cosine have no defined distance
                        tracing::debug!(idx, "Skipping row with undefined distance");
                        None
                    }
                }
            })
            .collect();

        // Ascending distance, ties broken by smaller slot id
        scored.sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);
        Ok(scored)
    }

    fn info(&self) -> IndexInfo {
        let mut extra = serde_json::Map::new();
        extra.insert(
            "distance_metric".into(),
            serde_json::to_value(self.metric).unwrap_or_default(),
        );
        IndexInfo {
            kind: IndexKind::Flat,
            built: self.built,
            vector_count: self.vectors.len(),
            dimensions: self.dim,
            extra,
        }
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }

    fn kind(&self) -> IndexKind {
        IndexKind::Flat
    }
}
