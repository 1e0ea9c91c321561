//! HNSW (Hierarchical Navigable Small World) index
//!
//! Layered proximity graph for approximate nearest neighbor search. Layer 0
//! holds every element; higher layers hold a geometrically thinning subset
//! used to zoom in before the wide layer-0 sweep. Distances are L2.
//!
//! ## Graph invariants
//!
//! - A node at layer `l > 0` is present at every layer below it.
//! - Neighbor lists are pruned to at most `m` entries.
//! - Edges are created bidirectionally, but pruning is unilateral: the
//!   dropped side keeps its outgoing edge. Accepted by construction.
//! - The entry point is the first inserted element at its drawn level and
//!   is never moved.
//!
//! Construction is probabilistic. The level RNG is seedable through
//! `IndexParams::seed` so builds can be reproduced exactly in tests.

mod build;
mod search;

use std::collections::HashMap;

use crate::index::{IndexError, IndexInfo, IndexKind, IndexParams, VectorIndex};

/// Hard cap on the level draw. With `level_scale = 1.0` the probability of
/// reaching it is ~e^-16; the cap only guards degenerate scale values.
pub(crate) const MAX_LEVEL: usize = 16;

pub struct HnswIndex {
    /// One adjacency map per layer; `layers[0]` contains every element.
    pub(crate) layers: Vec<HashMap<u32, Vec<u32>>>,
    /// `(element id, level)` where searches begin.
    pub(crate) entry_point: Option<(u32, usize)>,
    /// Vector snapshot taken at build time, positions are element ids.
    pub(crate) vectors: Vec<Vec<f32>>,
    pub(crate) dim: usize,
    pub(crate) m: usize,
    pub(crate) ef_construction: usize,
    pub(crate) ef_search: usize,
    pub(crate) level_scale: f64,
    pub(crate) seed: Option<u64>,
    pub(crate) built: bool,
}

impl HnswIndex {
    pub fn new() -> Self {
        let defaults = IndexParams::default();
        Self {
            layers: Vec::new(),
            entry_point: None,
            vectors: Vec::new(),
            dim: 0,
            m: defaults.m,
            ef_construction: defaults.ef_construction,
            ef_search: defaults.ef_search,
            level_scale: defaults.level_scale,
            seed: defaults.seed,
            built: false,
        }
    }

    /// Number of layers in the graph.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn entry_point(&self) -> Option<(u32, usize)> {
        self.entry_point
    }

    /// Neighbor list of `id` at `layer`, if the node exists there.
    pub fn neighbors(&self, layer: usize, id: u32) -> Option<&[u32]> {
        self.layers.get(layer)?.get(&id).map(|v| v.as_slice())
    }

    pub fn contains(&self, layer: usize, id: u32) -> bool {
        self.layers
            .get(layer)
            .is_some_and(|l| l.contains_key(&id))
    }

    /// Ids present at `layer`, unordered.
    pub fn layer_ids(&self, layer: usize) -> Vec<u32> {
        self.layers
            .get(layer)
            .map(|l| l.keys().copied().collect())
            .unwrap_or_default()
    }

    /// L2 distance from `query` to the stored vector for `id`.
    pub(crate) fn distance_to(&self, query: &[f32], id: u32) -> Result<f32, IndexError> {
        let row = self
            .vectors
            .get(id as usize)
            .ok_or_else(|| IndexError::Corrupt(format!("node {id} has no vector")))?;
        crate::math::l2_distance(query, row).ok_or(IndexError::DimensionMismatch {
            expected: row.len(),
            actual: query.len(),
        })
    }

    pub(crate) fn from_parts(
        layers: Vec<HashMap<u32, Vec<u32>>>,
        entry_point: Option<(u32, usize)>,
        vectors: Vec<Vec<f32>>,
        dim: usize,
        params: &IndexParams,
        built: bool,
    ) -> Self {
        Self {
            layers,
            entry_point,
            vectors,
            dim,
            m: params.m,
            ef_construction: params.ef_construction,
            ef_search: params.ef_search,
            level_scale: params.level_scale,
            seed: params.seed,
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

    pub(crate) fn params(&self) -> IndexParams {
        IndexParams {
            m: self.m,
            ef_construction: self.ef_construction,
            ef_search: self.ef_search,
            level_scale: self.level_scale,
            seed: self.seed,
            distance_metric: crate::index::DistanceMetric::L2,
        }
    }
}

impl Default for HnswIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VectorIndex for HnswIndex {
    fn build(&mut self, vectors: Vec<Vec<f32>>, params: &IndexParams) -> Result<(), IndexError> {
        self.m = params.m;
        self.ef_construction = params.ef_construction;
        self.ef_search = params.ef_search;
        self.level_scale = params.level_scale;
        self.seed = params.seed;
        self.build_graph(vectors)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(u32, f32)>, IndexError> {
        self.knn(query, k)
    }

    fn info(&self) -> IndexInfo {
        let mut extra = serde_json::Map::new();
        extra.insert("m".into(), self.m.into());
        extra.insert("ef_construction".into(), self.ef_construction.into());
        extra.insert("ef_search".into(), self.ef_search.into());
        extra.insert("level_scale".into(), self.level_scale.into());
        extra.insert("levels".into(), self.layers.len().into());
        IndexInfo {
            kind: IndexKind::Hnsw,
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
        IndexKind::Hnsw
    }
}

/// Shared test helper: deterministic pseudo-random vectors from a seed.
#[cfg(test)]
pub(crate) fn test_vectors(seed: u64, n: usize, dim: usize) -> Vec<Vec<f32>> {
    use rand::rngs::StdRng;
    use rand::{RngExt, SeedableRng};
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.random::<f32>() * 2.0 - 1.0).collect())
        .collect()
}
