//! HNSW graph construction
//!
//! Elements are inserted in ascending id order. The first element seeds the
//! entry point at its drawn level; every later element descends greedily
//! through the upper layers, then connects layer by layer from its own
//! level down to 0.

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use crate::index::IndexError;

use super::{HnswIndex, MAX_LEVEL};

impl HnswIndex {
    pub(crate) fn build_graph(&mut self, vectors: Vec<Vec<f32>>) -> Result<(), IndexError> {
        tracing::info!(count = vectors.len(), m = self.m, "Building HNSW index");

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
        self.layers.clear();
        self.entry_point = None;
        self.built = false;

        if self.vectors.is_empty() {
            self.built = true;
            tracing::info!("HNSW index built (empty)");
            return Ok(());
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => rand::make_rng(),
        };

        // First element: node at every layer up to its level, becomes the
        // permanent entry point.
        let first_level = self.draw_level(&mut rng);
        for _ in 0..=first_level {
            self.layers.push(Default::default());
        }
        for layer in 0..=first_level {
            self.layers[layer].insert(0, Vec::new());
        }
        self.entry_point = Some((0, first_level));

        for id in 1..self.vectors.len() {
            let level = self.draw_level(&mut rng);
            self.insert_element(id as u32, level)?;
        }

        self.built = true;
        tracing::info!(
            levels = self.layers.len(),
            "HNSW index built successfully"
        );
        Ok(())
    }

    /// Geometric level draw: `floor(-ln(U) * level_scale)`, `U ~ (0,1)`.
    fn draw_level(&self, rng: &mut StdRng) -> usize {
        let u: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
        let level = (-u.ln() * self.level_scale).floor();
        (level as usize).min(MAX_LEVEL)
    }

    fn insert_element(&mut self, id: u32, element_level: usize) -> Result<(), IndexError> {
        while element_level >= self.layers.len() {
            self.layers.push(Default::default());
        }

        let (entry_id, _) = self.entry_point.ok_or(IndexError::MissingEntryPoint)?;
        let query = self
            .vectors
            .get(id as usize)
            .ok_or_else(|| IndexError::Corrupt(format!("element {id} has no vector")))?
            .clone();

        // Zoom in: breadth-1 greedy walk through the layers above the
        // element's own level.
        let mut current = entry_id;
        let mut layer = self.layers.len() - 1;
        while layer > element_level {
            if let Some(&(nearest, _)) = self.search_layer(&query, current, layer, 1)?.first() {
                current = nearest;
            }
            layer -= 1;
        }

        // Connect from the element's level down to 0.
        for l in (0..=element_level).rev() {
            let candidates = self.search_layer(&query, current, l, self.ef_construction)?;

            let mut neighbors = Vec::with_capacity(self.m.min(candidates.len()));
            for &(cand_id, _) in candidates.iter().take(self.m) {
                neighbors.push(cand_id);
                if let Some(adj) = self.layers[l].get_mut(&cand_id) {
                    adj.push(id);
                }
            }
            self.layers[l].insert(id, neighbors);

            for &(cand_id, _) in &candidates {
                let overfull = self.layers[l]
                    .get(&cand_id)
                    .is_some_and(|adj| adj.len() > self.m);
                if overfull {
                    self.prune_neighbors(cand_id, l)?;
                }
            }
        }
        Ok(())
    }

    /// Keep the `m` nearest neighbors of an overfull node, drop the rest.
    /// Unilateral: the dropped neighbors' own lists are not edited, which
    /// can leave one-directional edges behind.
    fn prune_neighbors(&mut self, id: u32, layer: usize) -> Result<(), IndexError> {
        let neighbor_ids: Vec<u32> = match self.layers[layer].get(&id) {
            Some(adj) if adj.len() > self.m => adj.clone(),
            _ => return Ok(()),
        };
        let base = self
            .vectors
            .get(id as usize)
            .ok_or_else(|| IndexError::Corrupt(format!("element {id} has no vector")))?
            .clone();

        let mut scored = Vec::with_capacity(neighbor_ids.len());
        for n in neighbor_ids {
            scored.push((n, self.distance_to(&base, n)?));
        }
        scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
        scored.truncate(self.m);

        if let Some(adj) = self.layers[layer].get_mut(&id) {
            *adj = scored.into_iter().map(|(n, _)| n).collect();
        }
        Ok(())
    }
}
