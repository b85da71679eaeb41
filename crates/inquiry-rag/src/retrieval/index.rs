//! Per-document retrieval indices
//!
//! Indices are read-mostly and shared across requests behind `Arc`. At most
//! one task builds a given document's index at a time; a finished index is
//! swapped into the registry whole, so readers see either the old index or
//! the new one.

use dashmap::DashMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::storage::RecordStore;
use crate::types::Chunk;

use super::dense::DenseIndex;
use super::lexical::Bm25Index;

/// Lexical and dense indices over one document's chunks
pub struct DocumentIndex {
    pub document_id: Uuid,
    lexical: Bm25Index,
    dense: Option<DenseIndex>,
    positions: HashMap<Uuid, usize>,
}

impl DocumentIndex {
    pub fn new(document_id: Uuid, chunks: Vec<Chunk>, dense: Option<DenseIndex>) -> Self {
        let lexical = Bm25Index::build(chunks);
        let positions = lexical
            .chunks()
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id, i))
            .collect();

        Self {
            document_id,
            lexical,
            dense,
            positions,
        }
    }

    pub fn lexical(&self) -> &Bm25Index {
        &self.lexical
    }

    /// The dense index, if one has been built and persisted
    pub fn dense(&self) -> Option<&DenseIndex> {
        self.dense.as_ref()
    }

    pub fn chunk(&self, id: Uuid) -> Option<&Chunk> {
        self.positions.get(&id).map(|&i| &self.lexical.chunks()[i])
    }

    pub fn chunks(&self) -> &[Chunk] {
        self.lexical.chunks()
    }

    pub fn len(&self) -> usize {
        self.lexical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexical.is_empty()
    }
}

/// Shared registry of loaded document indices
pub struct IndexRegistry {
    store: Arc<dyn RecordStore>,
    index_dir: PathBuf,
    indexes: DashMap<Uuid, Arc<DocumentIndex>>,
    build_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl IndexRegistry {
    pub fn new(store: Arc<dyn RecordStore>, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            index_dir: index_dir.into(),
            indexes: DashMap::new(),
            build_locks: DashMap::new(),
        }
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    /// Take the build lock for a document
    ///
    /// Held by whoever loads or rebuilds the document's index.
    pub async fn lock_document(&self, document_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self
            .build_locks
            .entry(document_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Return the loaded index, loading it from storage on first use
    pub async fn get_or_load(&self, document_id: Uuid) -> Result<Arc<DocumentIndex>> {
        if let Some(index) = self.cached(document_id) {
            return Ok(index);
        }

        let _guard = self.lock_document(document_id).await;

        // Another task may have finished loading while we waited
        if let Some(index) = self.cached(document_id) {
            return Ok(index);
        }

        let document = self
            .store
            .get_document(document_id)?
            .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))?;

        let chunks = self.store.get_chunks(document_id)?;
        // An unreadable dense index only costs the dense source
        let dense = if document.processed {
            match DenseIndex::load(&self.index_dir, document_id).await {
                Ok(dense) => dense,
                Err(e) => {
                    tracing::warn!("Ignoring dense index for document {}: {}", document_id, e);
                    None
                }
            }
        } else {
            None
        };

        if dense.is_none() {
            tracing::warn!(
                "No dense index for document {} ({} chunks)",
                document_id,
                chunks.len()
            );
        }

        let index = Arc::new(DocumentIndex::new(document_id, chunks, dense));
        self.indexes.insert(document_id, Arc::clone(&index));

        tracing::info!(
            "Loaded index for document {} ({} chunks)",
            document_id,
            index.len()
        );
        Ok(index)
    }

    /// Swap in a freshly built index; caller must hold the document's build lock
    pub fn install(&self, index: DocumentIndex) -> Arc<DocumentIndex> {
        let index = Arc::new(index);
        self.indexes.insert(index.document_id, Arc::clone(&index));
        index
    }

    /// Forget a loaded index; the next request reloads it
    pub fn invalidate(&self, document_id: Uuid) {
        self.indexes.remove(&document_id);
    }

    /// Drop both the loaded and the persisted index
    pub async fn drop_index(&self, document_id: Uuid) -> Result<()> {
        self.invalidate(document_id);
        DenseIndex::remove(&self.index_dir, document_id).await
    }

    fn cached(&self, document_id: Uuid) -> Option<Arc<DocumentIndex>> {
        self.indexes.get(&document_id).map(|e| Arc::clone(e.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::HashEmbedder;
    use crate::storage::SqliteStore;
    use crate::types::Document;

    #[tokio::test]
    async fn test_concurrent_loads_share_one_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut doc = Document::new("Python", "x");
        doc.processed = true;
        store.insert_document(&doc).unwrap();

        let chunks = vec![
            Chunk::new(doc.id, 0, "Python is dynamically typed."),
            Chunk::new(doc.id, 1, "Lists hold mixed types."),
        ];
        store.replace_chunks(doc.id, &chunks).unwrap();

        let embedder = HashEmbedder::new(64);
        DenseIndex::build(doc.id, &chunks, &embedder)
            .await
            .unwrap()
            .save(dir.path())
            .await
            .unwrap();

        let registry = Arc::new(IndexRegistry::new(store, dir.path()));
        let (a, b) = tokio::join!(registry.get_or_load(doc.id), registry.get_or_load(doc.id));
        let (a, b) = (a.unwrap(), b.unwrap());

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 2);
        assert!(a.dense().is_some());
        assert_eq!(a.chunk(chunks[1].id).unwrap().text, "Lists hold mixed types.");
    }

    #[tokio::test]
    async fn test_unknown_document() {
        let dir = tempfile::tempdir().unwrap();
        let registry = IndexRegistry::new(Arc::new(SqliteStore::in_memory().unwrap()), dir.path());
        assert!(matches!(
            registry.get_or_load(Uuid::new_v4()).await,
            Err(Error::DocumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_dense_index_loads_without_dense() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let mut doc = Document::new("Python", "x");
        doc.processed = true;
        store.insert_document(&doc).unwrap();
        store
            .replace_chunks(
                doc.id,
                &[
                    Chunk::new(doc.id, 0, "Python is dynamically typed."),
                    Chunk::new(doc.id, 1, "Lists hold mixed types."),
                ],
            )
            .unwrap();

        let index_dir = DenseIndex::dir(dir.path(), doc.id);
        std::fs::create_dir_all(&index_dir).unwrap();
        std::fs::write(index_dir.join("dense.json"), "{not json").unwrap();

        let registry = IndexRegistry::new(store, dir.path());
        let index = registry.get_or_load(doc.id).await.unwrap();

        assert!(index.dense().is_none());
        assert_eq!(index.len(), 2);
        assert_eq!(index.lexical().search("lists", 5)[0].chunk.ordinal, 1);
    }

    #[tokio::test]
    async fn test_drop_index_forces_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let doc = Document::new("Python", "x");
        store.insert_document(&doc).unwrap();

        let registry = IndexRegistry::new(store, dir.path());
        let first = registry.get_or_load(doc.id).await.unwrap();
        assert!(first.dense().is_none());

        registry.drop_index(doc.id).await.unwrap();
        let second = registry.get_or_load(doc.id).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
