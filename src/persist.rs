//! Index blob persistence (save/load)
//!
//! One JSON blob per (library, kind) at `data/index_{library_id}_{KIND}.json`
//! with a blake3 sidecar at `index_{library_id}_{KIND}.checksum`. Each kind
//! serializes its own tagged shape; there is no reflective probing of index
//! internals. Blobs carry a format version so incompatible layouts are
//! detected instead of misread.
//!
//! Checksums detect accidental corruption (disk errors, incomplete writes)
//! only; they are not tamper-proofing. Both files are written via temp file
//! + rename, checksum last, so a crash mid-save leaves either the old index
//! intact or a blob that fails verification.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::flat::FlatIndex;
use crate::hnsw::HnswIndex;
use crate::index::{DistanceMetric, IndexError, IndexKind, IndexParams, VectorIndex};

pub const FORMAT_VERSION: u32 = 1;

/// Serialized index state. The `kind` tag selects the variant; unknown
/// tags fail deserialization rather than being guessed at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum IndexState {
    #[serde(rename = "HNSW")]
    Hnsw(HnswState),
    #[serde(rename = "FLAT")]
    Flat(FlatState),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HnswState {
    pub m: usize,
    pub ef_construction: usize,
    pub ef_search: usize,
    pub level_scale: f64,
    pub entry_point: Option<(u32, usize)>,
    pub layers: Vec<HashMap<u32, Vec<u32>>>,
    pub dim: usize,
    pub vectors: Vec<Vec<f32>>,
    pub built: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatState {
    pub distance_metric: DistanceMetric,
    pub dim: usize,
    pub vectors: Vec<Vec<f32>>,
    pub built: bool,
}

/// Versioned envelope written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexBlob {
    pub format_version: u32,
    #[serde(flatten)]
    pub state: IndexState,
}

impl IndexBlob {
    pub fn kind(&self) -> IndexKind {
        match self.state {
            IndexState::Hnsw(_) => IndexKind::Hnsw,
            IndexState::Flat(_) => IndexKind::Flat,
        }
    }

    pub fn from_hnsw(index: &HnswIndex) -> Self {
        let params = index.params();
        Self {
            format_version: FORMAT_VERSION,
            state: IndexState::Hnsw(HnswState {
                m: params.m,
                ef_construction: params.ef_construction,
                ef_search: params.ef_search,
                level_scale: params.level_scale,
                entry_point: index.entry_point(),
                layers: index.layers.clone(),
                dim: index.dim(),
                vectors: index.vectors().to_vec(),
                built: index.built(),
            }),
        }
    }

    pub fn from_flat(index: &FlatIndex) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            state: IndexState::Flat(FlatState {
                distance_metric: index.metric(),
                dim: index.dim(),
                vectors: index.vectors().to_vec(),
                built: index.built(),
            }),
        }
    }

    /// Reconstitute a queryable index from the blob.
    pub fn into_index(self) -> Box<dyn VectorIndex> {
        match self.state {
            IndexState::Hnsw(s) => {
                let params = IndexParams {
                    m: s.m,
                    ef_construction: s.ef_construction,
                    ef_search: s.ef_search,
                    level_scale: s.level_scale,
                    seed: None,
                    distance_metric: DistanceMetric::L2,
                };
                Box::new(HnswIndex::from_parts(
                    s.layers,
                    s.entry_point,
                    s.vectors,
                    s.dim,
                    &params,
                    s.built,
                ))
            }
            IndexState::Flat(s) => Box::new(FlatIndex::from_parts(
                s.vectors,
                s.dim,
                s.distance_metric,
                s.built,
            )),
        }
    }
}

pub fn blob_path(data_dir: &Path, library_id: &str, kind: IndexKind) -> PathBuf {
    data_dir.join(format!("index_{library_id}_{kind}.json"))
}

fn checksum_path(data_dir: &Path, library_id: &str, kind: IndexKind) -> PathBuf {
    data_dir.join(format!("index_{library_id}_{kind}.checksum"))
}

pub fn exists(data_dir: &Path, library_id: &str, kind: IndexKind) -> bool {
    blob_path(data_dir, library_id, kind).exists()
}

/// Persist a blob atomically. The checksum is written after the blob, so a
/// crash between the two renames is caught by verification on load.
pub fn save(data_dir: &Path, library_id: &str, blob: &IndexBlob) -> Result<(), IndexError> {
    let kind = blob.kind();
    tracing::info!(library = library_id, %kind, "Saving index blob");
    std::fs::create_dir_all(data_dir)?;

    let bytes = serde_json::to_vec(blob)
        .map_err(|e| IndexError::Corrupt(format!("failed to serialize index: {e}")))?;
    let hash = blake3::hash(&bytes);

    write_atomic(data_dir, &blob_path(data_dir, library_id, kind), &bytes)?;
    write_atomic(
        data_dir,
        &checksum_path(data_dir, library_id, kind),
        hash.to_hex().as_bytes(),
    )?;

    tracing::info!(library = library_id, %kind, bytes = bytes.len(), "Index blob saved");
    Ok(())
}

/// Load and verify a blob. Missing blob → `NotFound`; checksum or version
/// mismatch → corruption errors; a missing checksum file is tolerated with
/// a warning (pre-existing blobs).
pub fn load(data_dir: &Path, library_id: &str, kind: IndexKind) -> Result<IndexBlob, IndexError> {
    let path = blob_path(data_dir, library_id, kind);
    if !path.exists() {
        return Err(IndexError::NotFound(path.display().to_string()));
    }

    let bytes = std::fs::read(&path)?;
    verify_checksum(data_dir, library_id, kind, &path, &bytes)?;

    let blob: IndexBlob = serde_json::from_slice(&bytes)
        .map_err(|e| IndexError::Corrupt(format!("{}: {e}", path.display())))?;

    if blob.format_version > FORMAT_VERSION {
        return Err(IndexError::Corrupt(format!(
            "{}: format version {} is newer than supported {}",
            path.display(),
            blob.format_version,
            FORMAT_VERSION
        )));
    }
    if blob.kind() != kind {
        return Err(IndexError::Corrupt(format!(
            "{}: blob kind {} does not match requested {kind}",
            path.display(),
            blob.kind()
        )));
    }

    tracing::debug!(library = library_id, %kind, "Index blob loaded");
    Ok(blob)
}

fn verify_checksum(
    data_dir: &Path,
    library_id: &str,
    kind: IndexKind,
    blob: &Path,
    bytes: &[u8],
) -> Result<(), IndexError> {
    let path = checksum_path(data_dir, library_id, kind);
    let Ok(expected) = std::fs::read_to_string(&path) else {
        tracing::warn!(
            library = library_id,
            %kind,
            "No checksum file for index blob; skipping verification"
        );
        return Ok(());
    };
    let expected = expected.trim();
    let actual = blake3::hash(bytes).to_hex().to_string();
    if actual != expected {
        return Err(IndexError::ChecksumMismatch {
            file: blob.display().to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> Result<(), IndexError> {
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::fs::write(tmp.path(), bytes)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
