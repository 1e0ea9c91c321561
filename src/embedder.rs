//! Embedding provider client
//!
//! Turns chunk text into vectors through a Cohere-compatible `/v1/embed`
//! endpoint. The provider sits behind the [`TextEmbedder`] trait so the
//! services can run against a deterministic stub in tests. The client is
//! blocking on purpose: chunk creation is synchronous and runs on blocking
//! worker threads, and the embed call happens before any library lock is
//! taken.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EmbeddingConfig;

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("embedding API key is not configured")]
    MissingApiKey,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("embedding API returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("embedding API returned no embeddings")]
    Empty,
}

/// Black-box `text → vector<f32>` function that may fail.
pub trait TextEmbedder: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: Vec<&'a str>,
    model: &'a str,
    input_type: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Cohere-compatible embedding client.
#[derive(Debug)]
pub struct CohereEmbedder {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    model: String,
    input_type: String,
}

impl CohereEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbedError> {
        let api_key = config.api_key.clone().ok_or(EmbedError::MissingApiKey)?;
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
            input_type: config.input_type.clone(),
        })
    }
}

impl TextEmbedder for CohereEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        tracing::debug!(chars = text.len(), model = %self.model, "Requesting embedding");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbedRequest {
                texts: vec![text],
                model: &self.model,
                input_type: &self.input_type,
            })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(EmbedError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: EmbedResponse = response.json()?;
        let embedding = body.embeddings.into_iter().next().ok_or(EmbedError::Empty)?;
        if embedding.is_empty() {
            return Err(EmbedError::Empty);
        }
        tracing::debug!(dim = embedding.len(), "Embedding generated");
        Ok(embedding)
    }
}

/// Stand-in used when no API key is configured. Every embed attempt
/// fails, so chunk writes must carry caller-supplied embeddings.
pub struct DisabledEmbedder;

impl TextEmbedder for DisabledEmbedder {
    fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::MissingApiKey)
    }
}

/// Deterministic embedder for tests and offline runs: hashes the text into
/// a fixed-dimension pseudo-random unit vector.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl TextEmbedder for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let hash = blake3::hash(text.as_bytes());
        let bytes = hash.as_bytes();
        let mut v: Vec<f32> = (0..self.dim)
            .map(|i| {
                let b = bytes[i % bytes.len()];
                (b as f32 / 255.0) * 2.0 - 1.0 + (i as f32 * 0.001)
            })
            .collect();
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        Ok(v)
    }
}
