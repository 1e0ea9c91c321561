//! HNSW layered search
//!
//! `search_layer` is the best-first expansion both build and query run at
//! each layer. It exhausts the candidate heap rather than early-exiting on
//! the usual `d > worst_of_results` test; the exhaustive form keeps seeded
//! builds and persisted indexes reproducing results exactly.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use crate::index::IndexError;

use super::HnswIndex;

/// Heap entry ordered by distance, ties by smaller id.
#[derive(PartialEq)]
struct Candidate {
    dist: f32,
    id: u32,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl HnswIndex {
    /// Best-first expansion over one layer's adjacency starting at
    /// `entry`. Returns up to `ef` `(id, distance)` pairs sorted ascending.
    /// An entry absent from the layer yields an empty result.
    pub(crate) fn search_layer(
        &self,
        query: &[f32],
        entry: u32,
        layer: usize,
        ef: usize,
    ) -> Result<Vec<(u32, f32)>, IndexError> {
        let Some(adjacency) = self.layers.get(layer) else {
            return Ok(Vec::new());
        };
        if !adjacency.contains_key(&entry) || ef == 0 {
            return Ok(Vec::new());
        }

        let mut visited: HashSet<u32> = HashSet::from([entry]);
        let mut candidates: BinaryHeap<std::cmp::Reverse<Candidate>> = BinaryHeap::new();
        candidates.push(std::cmp::Reverse(Candidate {
            dist: self.distance_to(query, entry)?,
            id: entry,
        }));
        let mut results: Vec<(u32, f32)> = Vec::new();

        while let Some(std::cmp::Reverse(Candidate { dist, id })) = candidates.pop() {
            let accept = match results.last() {
                None => true,
                Some(&(_, worst)) => results.len() < ef || dist < worst,
            };
            if accept {
                results.push((id, dist));
                results.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
                results.truncate(ef);
            }

            if let Some(neighbors) = adjacency.get(&id) {
                for &n in neighbors {
                    if visited.insert(n) {
                        candidates.push(std::cmp::Reverse(Candidate {
                            dist: self.distance_to(query, n)?,
                            id: n,
                        }));
                    }
                }
            }
        }

        Ok(results)
    }

    /// Top-k search: greedy breadth-1 descent through the upper layers,
    /// then a full `ef_search` sweep at layer 0.
    pub(crate) fn knn(&self, query: &[f32], k: usize) -> Result<Vec<(u32, f32)>, IndexError> {
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
        let (entry_id, _) = self.entry_point.ok_or(IndexError::MissingEntryPoint)?;

        let mut current = entry_id;
        for layer in (1..self.layers.len()).rev() {
            if let Some(&(nearest, _)) = self.search_layer(query, current, layer, 1)?.first() {
                current = nearest;
            }
        }

        let results = self.search_layer(query, current, 0, self.ef_search)?;
        Ok(results.into_iter().take(k).collect())
    }
}
