//! Service-level error taxonomy
//!
//! Per-module errors (`StoreError`, `IndexError`, ...) stay close to their
//! modules; `ServiceError` is the orchestration-layer roll-up the HTTP
//! surface maps onto status codes: Validation → 400, NotFound → 404,
//! everything else (dependency failures included) → 500.

use thiserror::Error;

use crate::embedder::EmbedError;
use crate::index::IndexError;
use crate::store::StoreError;
use crate::vectors::VectorFileError;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Caller mistake: empty id, bad k, dimension mismatch, unknown kind.
    #[error("{0}")]
    Validation(String),

    /// Entity or index absent.
    #[error("{0}")]
    NotFound(String),

    /// The embedding provider failed; the request cannot proceed.
    #[error("embedding provider failure: {0}")]
    Embedding(#[from] EmbedError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Vectors(#[from] VectorFileError),

    /// Unexpected in-process failure (worker pool, task join, ...).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

/// Reject empty or whitespace-only identifiers.
pub fn require_id(value: &str, what: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::Validation(format!("{what} cannot be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_id_rejects_blank() {
        assert!(require_id("", "library ID").is_err());
        assert!(require_id("   ", "library ID").is_err());
        assert!(require_id("lib-1", "library ID").is_ok());
    }

    #[test]
    fn test_validation_message_passthrough() {
        let err = ServiceError::validation("k must be greater than 0");
        assert_eq!(err.to_string(), "k must be greater than 0");
    }
}
