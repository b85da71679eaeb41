//! Task orchestrators: chat, quiz, summary, and explanation pipelines
//!
//! Each public entry point returns a payload that either carries a result or
//! names the error; failures inside a pipeline never escape as panics or
//! empty successes.

mod chat;
mod explanation;
mod quiz;
mod summary;

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::Result;
use crate::history::{HistoryCompressor, QueryRewriter};
use crate::ingestion::{DocumentProcessor, ProcessReport, TextChunker};
use crate::providers::{shared_services, GraphStore, LlmRequest, Services};
use crate::retrieval::{DenseRetriever, FusionEngine, GraphRetriever, HybridSearcher, IndexRegistry};
use crate::storage::{RecordStore, SqliteStore};
use crate::structured::StructuredOutputValidator;
use crate::types::Document;

pub use quiz::{resolve_quiz_parameters, QuizParameters};

/// The RAG engine: retrieval, generation, and persistence wired together
pub struct RagEngine {
    config: RagConfig,
    store: Arc<dyn RecordStore>,
    services: Services,
    searcher: HybridSearcher,
    validator: Arc<StructuredOutputValidator>,
    rewriter: QueryRewriter,
    compressor: HistoryCompressor,
    processor: DocumentProcessor,
}

impl RagEngine {
    /// Wire an engine from explicit collaborators
    pub fn new(
        config: RagConfig,
        store: Arc<dyn RecordStore>,
        graph: Arc<dyn GraphStore>,
        services: Services,
    ) -> Self {
        let timeout = Duration::from_secs(config.llm.timeout_secs);
        let validator = Arc::new(StructuredOutputValidator::new(
            Arc::clone(&services.llm),
            config.structured.max_retries,
            timeout,
        ));

        let registry = Arc::new(IndexRegistry::new(
            Arc::clone(&store),
            config.storage.index_dir.clone(),
        ));

        let searcher = HybridSearcher::new(
            &config.retrieval,
            Arc::clone(&registry),
            DenseRetriever::new(Arc::clone(&services.embedder)),
            Some(GraphRetriever::new(
                Arc::clone(&graph),
                Some(Arc::clone(&validator)),
            )),
            FusionEngine::new(&config.retrieval, services.reranker.clone()),
        );

        let processor = DocumentProcessor::new(
            Arc::clone(&store),
            registry,
            TextChunker::from_config(&config.chunking),
            Arc::clone(&services.embedder),
        )
        .with_graph(graph, Arc::clone(&validator));

        let rewriter = QueryRewriter::new(
            Arc::clone(&services.llm),
            timeout,
            config.history.rewrite_min_ratio,
        );
        let compressor = HistoryCompressor::new(Arc::clone(&services.llm), timeout, &config.history);

        Self {
            config,
            store,
            services,
            searcher,
            validator,
            rewriter,
            compressor,
            processor,
        }
    }

    /// Open the SQLite store from configuration and use the process-wide services
    pub fn open(config: RagConfig) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(SqliteStore::new(&config.storage.database_path)?);
        let services = shared_services(&config)?.clone();

        tracing::info!(
            "RAG engine ready (database: {}, indices: {})",
            config.storage.database_path.display(),
            config.storage.index_dir.display()
        );

        Ok(Self::new(config, store.clone(), store, services))
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn validator(&self) -> &StructuredOutputValidator {
        &self.validator
    }

    /// Store and process a new document
    pub async fn ingest(&self, title: &str, content: &str) -> Result<(Document, ProcessReport)> {
        self.processor.ingest(title, content).await
    }

    /// (Re)process a stored document
    pub async fn process(&self, document_id: Uuid, force: bool) -> Result<ProcessReport> {
        self.processor.process(document_id, force).await
    }

    /// Base generation request using the configured sampling settings
    fn llm_request(&self, prompt: String, system: String) -> LlmRequest {
        LlmRequest::new(prompt)
            .with_system(system)
            .with_temperature(self.config.llm.temperature)
            .with_max_tokens(self.config.llm.max_tokens)
    }
}

fn elapsed_ms(start: std::time::Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
