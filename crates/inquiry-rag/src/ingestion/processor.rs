//! Document processing pipeline: chunk, index, extract graph triples

use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::providers::llm::LlmRequest;
use crate::providers::{EmbeddingProvider, GraphStore};
use crate::retrieval::{DenseIndex, DocumentIndex, IndexRegistry};
use crate::storage::RecordStore;
use crate::structured::{prompt_with_schema, StructuredOutputValidator, TripleSet};
use crate::types::{Chunk, Document, GraphTriple};

use super::chunker::TextChunker;

const TRIPLE_PROMPT: &str = "Extract the factual relations stated in the text below as \
(source, relation, target) triples. Use short noun phrases for source and target and a \
short verb phrase for the relation. Return an empty list if the text states no relations.\n\n\
Text:\n";

/// What one processing run did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessReport {
    pub document_id: Uuid,
    /// Already processed and not forced
    pub skipped: bool,
    pub chunks: usize,
    pub vectors: usize,
    pub triples: usize,
    pub processing_time_ms: u64,
}

/// Builds chunks, the dense index, and the knowledge graph for documents
///
/// Reprocessing never patches: chunks, vectors, and triples are dropped and
/// regenerated as a whole, under the document's build lock.
pub struct DocumentProcessor {
    store: Arc<dyn RecordStore>,
    registry: Arc<IndexRegistry>,
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    graph: Option<GraphBuilder>,
}

struct GraphBuilder {
    store: Arc<dyn GraphStore>,
    validator: Arc<StructuredOutputValidator>,
}

impl DocumentProcessor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        registry: Arc<IndexRegistry>,
        chunker: TextChunker,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            store,
            registry,
            chunker,
            embedder,
            graph: None,
        }
    }

    /// Also extract triples into `graph` using model calls through `validator`
    pub fn with_graph(
        mut self,
        graph: Arc<dyn GraphStore>,
        validator: Arc<StructuredOutputValidator>,
    ) -> Self {
        self.graph = Some(GraphBuilder {
            store: graph,
            validator,
        });
        self
    }

    /// Store a new document and process it
    pub async fn ingest(&self, title: &str, content: &str) -> Result<(Document, ProcessReport)> {
        if content.trim().is_empty() {
            return Err(Error::precondition("document content is empty"));
        }

        let document = Document::new(title, content);
        self.store.insert_document(&document)?;
        tracing::info!("Ingested document {} ('{}')", document.id, title);

        let report = self.process(document.id, false).await?;
        Ok((document, report))
    }

    /// Chunk and index a document
    ///
    /// Processed documents are skipped unless `force` is set.
    pub async fn process(&self, document_id: Uuid, force: bool) -> Result<ProcessReport> {
        let start = Instant::now();
        if self.fetch(document_id)?.processed && !force {
            return Ok(ProcessReport::skipped(document_id));
        }

        let _guard = self.registry.lock_document(document_id).await;

        // A concurrent run may have finished while we waited for the lock
        let document = self.fetch(document_id)?;
        if document.processed && !force {
            return Ok(ProcessReport::skipped(document_id));
        }

        // Old state goes first so a failure below never leaves a stale mix
        self.store.set_processed(document_id, false)?;
        self.registry.drop_index(document_id).await?;
        let removed = self.store.delete_chunks(document_id)?;
        if removed > 0 {
            tracing::debug!("Removed {} old chunks for {}", removed, document_id);
        }

        let chunks = self.chunker.chunk_document(&document);
        self.store.replace_chunks(document_id, &chunks)?;

        let dense = DenseIndex::build(document_id, &chunks, self.embedder.as_ref()).await?;
        dense.save(self.registry.index_dir()).await?;
        let vectors = dense.len();

        let triples = match &self.graph {
            Some(graph) => graph.rebuild(document_id, &chunks).await,
            None => 0,
        };

        let chunk_count = chunks.len();
        self.registry
            .install(DocumentIndex::new(document_id, chunks, Some(dense)));
        self.store.set_processed(document_id, true)?;

        let report = ProcessReport {
            document_id,
            skipped: false,
            chunks: chunk_count,
            vectors,
            triples,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Processed document {}: {} chunks, {} vectors, {} triples in {}ms",
            document_id,
            report.chunks,
            report.vectors,
            report.triples,
            report.processing_time_ms
        );
        Ok(report)
    }
}

impl DocumentProcessor {
    fn fetch(&self, document_id: Uuid) -> Result<Document> {
        self.store
            .get_document(document_id)?
            .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))
    }
}

impl ProcessReport {
    fn skipped(document_id: Uuid) -> Self {
        tracing::info!("Document {} already processed, skipping", document_id);
        Self {
            document_id,
            skipped: true,
            ..Default::default()
        }
    }
}

impl GraphBuilder {
    /// Replace the document's triples; failures are logged, never fatal
    async fn rebuild(&self, document_id: Uuid, chunks: &[Chunk]) -> usize {
        if let Err(e) = self.store.clear(document_id).await {
            tracing::warn!("Failed to clear graph for {}: {}", document_id, e);
            return 0;
        }

        let mut triples = Vec::new();
        for chunk in chunks {
            match self.extract(chunk).await {
                Ok(mut extracted) => triples.append(&mut extracted),
                Err(e) if e.is_unavailable() => {
                    tracing::warn!("Graph extraction unavailable, stopping: {}", e);
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        "Triple extraction failed for chunk {} of {}: {}",
                        chunk.ordinal,
                        document_id,
                        e
                    );
                }
            }
        }

        if triples.is_empty() {
            return 0;
        }

        match self.store.upsert_triples(document_id, &triples).await {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!("Failed to store triples for {}: {}", document_id, e);
                0
            }
        }
    }

    async fn extract(&self, chunk: &Chunk) -> Result<Vec<GraphTriple>> {
        let prompt = prompt_with_schema::<TripleSet>(&format!("{}{}", TRIPLE_PROMPT, chunk.text), &[]);
        let request = LlmRequest::new(prompt).with_temperature(0.0);

        let out = self.validator.generate::<TripleSet>(&request).await?;
        Ok(out
            .value
            .triples
            .into_iter()
            .filter(|t| !t.source.trim().is_empty() && !t.target.trim().is_empty())
            .map(|t| GraphTriple {
                subject: t.source.trim().to_string(),
                relation: t.relation.trim().to_string(),
                object: t.target.trim().to_string(),
                chunk_id: chunk.id,
                document_id: chunk.document_id,
            })
            .collect())
    }
}
