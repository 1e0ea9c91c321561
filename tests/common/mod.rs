//! Shared test fixtures
//!
//! Each test binary compiles this module independently and uses a subset.
#![allow(dead_code)]

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};
use tempfile::TempDir;

use vqs::embedder::{HashEmbedder, TextEmbedder};
use vqs::{
    CatalogService, ChunkService, IndexingService, LockManager, QueryService, Store,
};

/// Deterministic pseudo-random vectors in [-1, 1).
pub fn make_vectors(seed: u64, n: usize, dim: usize) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| (0..dim).map(|_| rng.random::<f32>() * 2.0 - 1.0).collect())
        .collect()
}

/// A full service stack on a temp directory with a deterministic embedder.
pub struct TestApp {
    pub catalog: CatalogService,
    pub chunks: ChunkService,
    pub indexing: IndexingService,
    pub query: QueryService,
    pub locks: Arc<LockManager>,
    // Held for the lifetime of the app so the directory survives
    _tmp: TempDir,
}

pub fn test_app(embed_dim: usize) -> TestApp {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    let store = Arc::new(Store::open(&data_dir.join("vqs.db")).unwrap());
    let locks = Arc::new(LockManager::new());
    let embedder: Arc<dyn TextEmbedder> = Arc::new(HashEmbedder::new(embed_dim));

    TestApp {
        catalog: CatalogService::new(store.clone(), data_dir.clone()),
        chunks: ChunkService::new(store.clone(), locks.clone(), embedder, data_dir.clone()),
        indexing: IndexingService::new(store.clone(), locks.clone(), data_dir.clone()),
        query: QueryService::new(store, data_dir),
        locks,
        _tmp: tmp,
    }
}
