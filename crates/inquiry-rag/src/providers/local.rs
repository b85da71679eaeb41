//! Local provider implementations that need no running services

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::retrieval::tokenize::tokenize;

use super::embedding::EmbeddingProvider;

/// Deterministic feature-hashing embedder
///
/// Each term is hashed (SHA-256) into one of `dimensions` buckets with a
/// signed weight; the vector is L2-normalized. Texts sharing terms get a
/// positive cosine similarity. Used offline and in tests.
pub struct HashEmbedder {
    dimensions: usize,
    model: String,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        let dimensions = dimensions.max(1);
        Self {
            dimensions,
            model: format!("feature-hash-{}", dimensions),
        }
    }

    /// Embed synchronously
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for term in tokenize(text) {
            let digest = Sha256::digest(term.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        vector
    }
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "local-hash"
    }
}
