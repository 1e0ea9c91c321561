//! Per-library vector file
//!
//! One contiguous array of f32 rows per library at
//! `data/vectors_{library_id}.vec`. Slots are append-only: a chunk's
//! `vector_index` is the row position at insertion time and is never
//! renumbered. Deletions zero the row (tombstone) instead of compacting.
//!
//! Layout: 4-byte magic, u32 format version, u32 dimension, u64 row count,
//! then `count * dim` f32 values. Every write replaces the whole file via
//! write-to-temp + rename, so readers never observe a partial file.

use std::path::{Path, PathBuf};

use thiserror::Error;

const MAGIC: [u8; 4] = *b"VQSV";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 20;

#[derive(Error, Debug)]
pub enum VectorFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt vector file {path}: {reason}")]
    Corrupt { path: String, reason: String },
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("vector slot {slot} out of range ({count} rows)")]
    SlotOutOfRange { slot: u32, count: usize },
    #[error("cannot store an empty vector")]
    EmptyVector,
}

/// An in-memory snapshot of a library's vector array.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorSet {
    dim: usize,
    data: Vec<f32>,
}

impl VectorSet {
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn count(&self) -> usize {
        if self.dim == 0 {
            0
        } else {
            self.data.len() / self.dim
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Row at `slot`, or an error when the slot was never assigned.
    pub fn row(&self, slot: u32) -> Result<&[f32], VectorFileError> {
        let count = self.count();
        if (slot as usize) >= count {
            return Err(VectorFileError::SlotOutOfRange { slot, count });
        }
        let start = slot as usize * self.dim;
        Ok(&self.data[start..start + self.dim])
    }
}

/// Handle to a library's on-disk vector array.
pub struct VectorFile {
    path: PathBuf,
}

impl VectorFile {
    pub fn new(data_dir: &Path, library_id: &str) -> Self {
        Self {
            path: data_dir.join(format!("vectors_{library_id}.vec")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole array. A missing file is an empty library, not an
    /// error.
    pub fn load(&self) -> Result<VectorSet, VectorFileError> {
        if !self.path.exists() {
            return Ok(VectorSet::default());
        }
        let bytes = std::fs::read(&self.path)?;
        self.decode(&bytes)
    }

    /// Append a vector, returning its slot. The first appended vector
    /// fixes the library's dimension.
    pub fn append(&self, vector: &[f32]) -> Result<u32, VectorFileError> {
        if vector.is_empty() {
            return Err(VectorFileError::EmptyVector);
        }
        let mut set = self.load()?;
        if set.count() == 0 {
            set.dim = vector.len();
        } else if vector.len() != set.dim {
            return Err(VectorFileError::DimensionMismatch {
                expected: set.dim,
                actual: vector.len(),
            });
        }
        let slot = set.count() as u32;
        set.data.extend_from_slice(vector);
        self.write(&set)?;
        tracing::debug!(slot, path = %self.path.display(), "Vector appended");
        Ok(slot)
    }

    /// Replace the vector at an existing slot (chunk update).
    pub fn overwrite(&self, slot: u32, vector: &[f32]) -> Result<(), VectorFileError> {
        let mut set = self.load()?;
        let count = set.count();
        if (slot as usize) >= count {
            return Err(VectorFileError::SlotOutOfRange { slot, count });
        }
        if vector.len() != set.dim {
            return Err(VectorFileError::DimensionMismatch {
                expected: set.dim,
                actual: vector.len(),
            });
        }
        let start = slot as usize * set.dim;
        set.data[start..start + set.dim].copy_from_slice(vector);
        self.write(&set)
    }

    /// Zero the row at `slot`. The slot number stays occupied; callers
    /// rebuild indexes to drop the chunk from search results.
    pub fn tombstone(&self, slot: u32) -> Result<(), VectorFileError> {
        let set = self.load()?;
        let zeros = vec![0.0f32; set.dim()];
        self.overwrite(slot, &zeros)?;
        tracing::debug!(slot, path = %self.path.display(), "Vector tombstoned");
        Ok(())
    }

    /// Delete the file entirely (library removal).
    pub fn remove(&self) -> Result<(), VectorFileError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<VectorSet, VectorFileError> {
        let corrupt = |reason: &str| VectorFileError::Corrupt {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        };
        if bytes.len() < HEADER_LEN {
            return Err(corrupt("truncated header"));
        }
        if bytes[0..4] != MAGIC {
            return Err(corrupt("bad magic"));
        }
        let version = u32::from_le_bytes(bytes[4..8].try_into().unwrap_or_default());
        if version != FORMAT_VERSION {
            return Err(corrupt(&format!("unsupported format version {version}")));
        }
        let dim = u32::from_le_bytes(bytes[8..12].try_into().unwrap_or_default()) as usize;
        let count = u64::from_le_bytes(bytes[12..20].try_into().unwrap_or_default()) as usize;
        let payload = &bytes[HEADER_LEN..];
        let expected_len = dim
            .checked_mul(count)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| corrupt("row count overflow"))?;
        if payload.len() != expected_len {
            return Err(corrupt("payload length does not match header"));
        }
        // pod_collect_to_vec copies, so unaligned reads are fine
        let data: Vec<f32> = bytemuck::pod_collect_to_vec(payload);
        Ok(VectorSet { dim, data })
    }

    fn write(&self, set: &VectorSet) -> Result<(), VectorFileError> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let mut bytes = Vec::with_capacity(HEADER_LEN + set.data.len() * 4);
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(set.dim as u32).to_le_bytes());
        bytes.extend_from_slice(&(set.count() as u64).to_le_bytes());
        bytes.extend_from_slice(bytemuck::cast_slice(&set.data));

        // Temp file in the same directory so the rename stays on one
        // filesystem and is atomic.
        let tmp = tempfile::NamedTempFile::new_in(parent)?;
        std::fs::write(tmp.path(), &bytes)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let vf = VectorFile::new(tmp.path(), "lib");
        let set = vf.load().unwrap();
        assert!(set.is_empty());
        assert_eq!(set.dim(), 0);
    }

    #[test]
    fn test_append_assigns_sequential_slots() {
        let tmp = TempDir::new().unwrap();
        let vf = VectorFile::new(tmp.path(), "lib");
        assert_eq!(vf.append(&[1.0, 0.0, 0.0]).unwrap(), 0);
        assert_eq!(vf.append(&[0.0, 1.0, 0.0]).unwrap(), 1);
        assert_eq!(vf.append(&[0.0, 0.0, 1.0]).unwrap(), 2);

        let set = vf.load().unwrap();
        assert_eq!(set.count(), 3);
        assert_eq!(set.dim(), 3);
        assert_eq!(set.row(1).unwrap(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_first_append_fixes_dimension() {
        let tmp = TempDir::new().unwrap();
        let vf = VectorFile::new(tmp.path(), "lib");
        vf.append(&[1.0, 2.0]).unwrap();
        let err = vf.append(&[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            VectorFileError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn test_overwrite_and_tombstone() {
        let tmp = TempDir::new().unwrap();
        let vf = VectorFile::new(tmp.path(), "lib");
        vf.append(&[1.0, 1.0]).unwrap();
        vf.append(&[2.0, 2.0]).unwrap();

        vf.overwrite(0, &[9.0, 9.0]).unwrap();
        assert_eq!(vf.load().unwrap().row(0).unwrap(), &[9.0, 9.0]);

        vf.tombstone(1).unwrap();
        assert_eq!(vf.load().unwrap().row(1).unwrap(), &[0.0, 0.0]);
        // Slot count unchanged: tombstones never compact
        assert_eq!(vf.load().unwrap().count(), 2);
    }

    #[test]
    fn test_overwrite_out_of_range() {
        let tmp = TempDir::new().unwrap();
        let vf = VectorFile::new(tmp.path(), "lib");
        vf.append(&[1.0]).unwrap();
        let err = vf.overwrite(5, &[2.0]).unwrap_err();
        assert!(matches!(err, VectorFileError::SlotOutOfRange { slot: 5, .. }));
    }

    #[test]
    fn test_empty_vector_rejected() {
        let tmp = TempDir::new().unwrap();
        let vf = VectorFile::new(tmp.path(), "lib");
        assert!(matches!(
            vf.append(&[]).unwrap_err(),
            VectorFileError::EmptyVector
        ));
    }

    #[test]
    fn test_corrupt_header_detected() {
        let tmp = TempDir::new().unwrap();
        let vf = VectorFile::new(tmp.path(), "lib");
        vf.append(&[1.0, 2.0]).unwrap();

        // Flip the magic
        let mut bytes = std::fs::read(vf.path()).unwrap();
        bytes[0] ^= 0xFF;
        std::fs::write(vf.path(), &bytes).unwrap();

        assert!(matches!(
            vf.load().unwrap_err(),
            VectorFileError::Corrupt { .. }
        ));
    }

    #[test]
    fn test_truncated_payload_detected() {
        let tmp = TempDir::new().unwrap();
        let vf = VectorFile::new(tmp.path(), "lib");
        vf.append(&[1.0, 2.0, 3.0]).unwrap();

        let bytes = std::fs::read(vf.path()).unwrap();
        std::fs::write(vf.path(), &bytes[..bytes.len() - 4]).unwrap();

        assert!(matches!(
            vf.load().unwrap_err(),
            VectorFileError::Corrupt { .. }
        ));
    }
}
