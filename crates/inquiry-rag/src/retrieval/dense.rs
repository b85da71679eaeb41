//! Dense (embedding) retrieval with a per-document persisted index
//!
//! Each document's vectors live in `<index_dir>/<document_id>/dense.json`,
//! written to a temporary file and renamed into place so readers never see
//! a partial index.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::Chunk;

const INDEX_FILE: &str = "dense.json";

/// Compute cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// A dense match; lower distance is closer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DenseHit {
    pub chunk_id: Uuid,
    pub ordinal: u32,
    /// Cosine distance (`1 - cosine similarity`), in `[0, 2]`
    pub distance: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DenseEntry {
    chunk_id: Uuid,
    ordinal: u32,
    vector: Vec<f32>,
}

/// Brute-force vector index over one document's chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenseIndex {
    pub document_id: Uuid,
    /// Embedding model that produced the vectors
    pub model: String,
    pub dimensions: usize,
    entries: Vec<DenseEntry>,
}

impl DenseIndex {
    /// Embed every chunk and build an index
    pub async fn build(
        document_id: Uuid,
        chunks: &[Chunk],
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Self> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed_batch(&texts).await?;

        if vectors.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let entries = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| DenseEntry {
                chunk_id: chunk.id,
                ordinal: chunk.ordinal,
                vector,
            })
            .collect();

        Ok(Self {
            document_id,
            model: embedder.model_id().to_string(),
            dimensions: embedder.dimensions(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Nearest `k` chunks to a query vector, closest first
    pub fn search(&self, query: &[f32], k: usize) -> Vec<DenseHit> {
        let mut hits: Vec<DenseHit> = self
            .entries
            .iter()
            .map(|e| DenseHit {
                chunk_id: e.chunk_id,
                ordinal: e.ordinal,
                distance: 1.0 - cosine_similarity(query, &e.vector),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.ordinal.cmp(&b.ordinal))
        });
        hits.truncate(k);
        hits
    }

    /// Directory holding a document's persisted index
    pub fn dir(root: &Path, document_id: Uuid) -> PathBuf {
        root.join(document_id.to_string())
    }

    /// Persist atomically under `root`
    pub async fn save(&self, root: &Path) -> Result<()> {
        let dir = Self::dir(root, self.document_id);
        tokio::fs::create_dir_all(&dir).await?;

        let tmp = dir.join(format!("{}.tmp", INDEX_FILE));
        let bytes = serde_json::to_vec(self)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, dir.join(INDEX_FILE)).await?;

        tracing::debug!(
            "Saved dense index for {} ({} vectors)",
            self.document_id,
            self.entries.len()
        );
        Ok(())
    }

    /// Load a persisted index; `None` if the document has none
    pub async fn load(root: &Path, document_id: Uuid) -> Result<Option<Self>> {
        let path = Self::dir(root, document_id).join(INDEX_FILE);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let index: DenseIndex = serde_json::from_slice(&bytes).map_err(|e| {
                    Error::vector_index(format!("corrupt index {}: {}", path.display(), e))
                })?;
                Ok(Some(index))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop a document's persisted index
    pub async fn remove(root: &Path, document_id: Uuid) -> Result<()> {
        let dir = Self::dir(root, document_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Embeds queries and searches a document's dense index
pub struct DenseRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
}

impl DenseRetriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder }
    }

    /// Search, reporting a missing index as `Unavailable` rather than empty
    pub async fn search(
        &self,
        index: Option<&DenseIndex>,
        query: &str,
        k: usize,
    ) -> Result<Vec<DenseHit>> {
        let index = index.ok_or_else(|| Error::unavailable("no dense index for document"))?;

        if index.model != self.embedder.model_id() {
            return Err(Error::unavailable(format!(
                "dense index built with '{}' but embedder is '{}'",
                index.model,
                self.embedder.model_id()
            )));
        }

        let query_vector = self.embedder.embed(query).await?;
        Ok(index.search(&query_vector, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashEmbedder;

    fn chunks(texts: &[&str]) -> (Uuid, Vec<Chunk>) {
        let doc = Uuid::new_v4();
        let chunks = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk::new(doc, i as u32, *t))
            .collect();
        (doc, chunks)
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_orders_by_distance() {
        let embedder = HashEmbedder::new(128);
        let (doc, chunks) = chunks(&[
            "tuples are immutable records",
            "python lists hold mixed types",
        ]);
        let index = DenseIndex::build(doc, &chunks, &embedder).await.unwrap();

        let query = embedder.embed_text("python lists");
        let hits = index.search(&query, 2);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk_id, chunks[1].id);
        assert!(hits[0].distance <= hits[1].distance);
    }

    #[tokio::test]
    async fn test_missing_index_is_unavailable() {
        let retriever = DenseRetriever::new(Arc::new(HashEmbedder::new(32)));
        let err = retriever.search(None, "anything", 3).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_save_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let embedder = HashEmbedder::new(32);
        let (doc, chunks) = chunks(&["one", "two"]);

        assert!(DenseIndex::load(dir.path(), doc).await.unwrap().is_none());

        let index = DenseIndex::build(doc, &chunks, &embedder).await.unwrap();
        index.save(dir.path()).await.unwrap();

        let loaded = DenseIndex::load(dir.path(), doc).await.unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.model, embedder.model_id());

        DenseIndex::remove(dir.path(), doc).await.unwrap();
        assert!(DenseIndex::load(dir.path(), doc).await.unwrap().is_none());
        DenseIndex::remove(dir.path(), doc).await.unwrap();
    }
}
