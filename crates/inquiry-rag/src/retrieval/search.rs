//! Hybrid search: lexical, dense, and graph retrieval fused into one list

use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::types::{RetrievalSource, RetrievedPassage};

use super::dense::DenseRetriever;
use super::fusion::{FusionEngine, SourceCandidates};
use super::graph::{GraphHits, GraphRetriever};
use super::index::{DocumentIndex, IndexRegistry};

/// Fused passages and the model tokens retrieval spent
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub passages: Vec<RetrievedPassage>,
    pub tokens_used: u32,
}

/// Runs every retrieval source for a document and fuses the results
///
/// A source that fails is logged and left out; it never aborts the search.
pub struct HybridSearcher {
    registry: Arc<IndexRegistry>,
    dense: DenseRetriever,
    graph: Option<GraphRetriever>,
    fusion: FusionEngine,
    candidate_k: usize,
    graph_limit: usize,
}

impl HybridSearcher {
    pub fn new(
        config: &RetrievalConfig,
        registry: Arc<IndexRegistry>,
        dense: DenseRetriever,
        graph: Option<GraphRetriever>,
        fusion: FusionEngine,
    ) -> Self {
        Self {
            registry,
            dense,
            graph,
            fusion,
            candidate_k: config.candidate_k,
            graph_limit: config.graph_limit,
        }
    }

    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    /// Retrieve passages for a query within one document
    ///
    /// Returns no passages when no document is in scope.
    pub async fn search(&self, query: &str, document_id: Option<Uuid>) -> Result<SearchResults> {
        let Some(document_id) = document_id else {
            return Ok(SearchResults::default());
        };

        let start = Instant::now();
        let index = self.registry.get_or_load(document_id).await?;

        let lexical = SourceCandidates::lexical(index.lexical().search(query, self.candidate_k));
        let (dense, (graph, tokens_used)) = tokio::join!(
            self.dense_candidates(&index, query),
            self.graph_candidates(&index, query),
        );

        let mut lists = vec![lexical];
        lists.extend(dense);
        lists.extend(graph);

        let passages = self.fusion.fuse(query, lists, true).await;

        tracing::info!(
            "Retrieved {} passages for document {} in {}ms",
            passages.len(),
            document_id,
            start.elapsed().as_millis()
        );
        Ok(SearchResults {
            passages,
            tokens_used,
        })
    }

    async fn dense_candidates(&self, index: &DocumentIndex, query: &str) -> Option<SourceCandidates> {
        match self.dense.search(index.dense(), query, self.candidate_k).await {
            Ok(hits) => Some(SourceCandidates::dense(
                hits.into_iter()
                    .filter_map(|h| index.chunk(h.chunk_id).map(|c| (c.clone(), h.distance)))
                    .collect(),
            )),
            Err(e) => {
                tracing::warn!(
                    "Skipping {} retrieval for document {}: {}",
                    RetrievalSource::Dense,
                    index.document_id,
                    e
                );
                None
            }
        }
    }

    async fn graph_candidates(
        &self,
        index: &DocumentIndex,
        query: &str,
    ) -> (Option<SourceCandidates>, u32) {
        let Some(graph) = self.graph.as_ref() else {
            return (None, 0);
        };
        match graph
            .search(query, Some(index.document_id), self.graph_limit)
            .await
        {
            Ok(GraphHits {
                chunk_ids,
                tokens_used,
            }) => (
                Some(SourceCandidates::graph(
                    chunk_ids
                        .into_iter()
                        .filter_map(|id| index.chunk(id).cloned())
                        .collect(),
                )),
                tokens_used,
            ),
            Err(e) => {
                tracing::warn!(
                    "Skipping {} retrieval for document {}: {}",
                    RetrievalSource::Graph,
                    index.document_id,
                    e
                );
                (None, 0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::graph_store::InMemoryGraphStore;
    use crate::providers::{EmbeddingProvider, GraphStore, HashEmbedder};
    use crate::retrieval::dense::DenseIndex;
    use crate::storage::{RecordStore, SqliteStore};
    use crate::types::{Chunk, Document, GraphTriple};

    #[tokio::test]
    async fn test_missing_dense_index_degrades_to_other_sources() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let doc = Document::new("Python", "x");
        store.insert_document(&doc).unwrap();

        let chunks = vec![
            Chunk::new(doc.id, 0, "Python is dynamically typed."),
            Chunk::new(doc.id, 1, "Lists hold mixed types."),
            Chunk::new(doc.id, 2, "Tuples are immutable."),
        ];
        store.replace_chunks(doc.id, &chunks).unwrap();

        let graph_store = Arc::new(InMemoryGraphStore::new());
        graph_store
            .upsert_triples(
                doc.id,
                &[GraphTriple {
                    subject: "tuples".to_string(),
                    relation: "are".to_string(),
                    object: "immutable".to_string(),
                    chunk_id: chunks[2].id,
                    document_id: doc.id,
                }],
            )
            .await
            .unwrap();

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::new(64));
        let config = RetrievalConfig::default();
        let searcher = HybridSearcher::new(
            &config,
            Arc::new(IndexRegistry::new(store, dir.path())),
            DenseRetriever::new(embedder),
            Some(GraphRetriever::new(graph_store, None)),
            FusionEngine::new(&config, None),
        );

        let passages = searcher
            .search("lists and tuples", Some(doc.id))
            .await
            .unwrap()
            .passages;

        let ids: Vec<Uuid> = passages.iter().map(|p| p.chunk.id).collect();
        assert!(ids.contains(&chunks[1].id));
        assert!(ids.contains(&chunks[2].id));
        assert!(passages
            .iter()
            .all(|p| !p.sources.contains(&RetrievalSource::Dense)));

        assert!(searcher.search("lists", None).await.unwrap().passages.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_dense_index_keeps_lexical_results() {
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

        let index_dir = DenseIndex::dir(dir.path(), doc.id);
        std::fs::create_dir_all(&index_dir).unwrap();
        std::fs::write(index_dir.join("dense.json"), "{not json").unwrap();

        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::new(64));
        let config = RetrievalConfig::default();
        let searcher = HybridSearcher::new(
            &config,
            Arc::new(IndexRegistry::new(store, dir.path())),
            DenseRetriever::new(embedder),
            Some(GraphRetriever::new(Arc::new(InMemoryGraphStore::new()), None)),
            FusionEngine::new(&config, None),
        );

        let results = searcher.search("lists", Some(doc.id)).await.unwrap();

        assert!(!results.passages.is_empty());
        assert_eq!(results.passages[0].chunk.id, chunks[1].id);
        assert!(results.passages[0].sources.contains(&RetrievalSource::Lexical));
        assert!(results
            .passages
            .iter()
            .all(|p| !p.sources.contains(&RetrievalSource::Dense)));
        assert_eq!(results.tokens_used, 0);
    }
}
