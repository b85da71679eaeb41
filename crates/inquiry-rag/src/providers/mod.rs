//! Provider abstractions for embeddings, LLM, cross-encoder, and graph storage
//!
//! Core components receive providers as constructor arguments. [`Services`]
//! bundles one set of them, and [`shared_services`] gives the process a
//! single lazily-built instance so models are not loaded twice.

pub mod embedding;
pub mod graph_store;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod reranker;

use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;

pub use embedding::EmbeddingProvider;
pub use graph_store::{GraphStore, InMemoryGraphStore};
pub use llm::{LlmOutcome, LlmProvider, LlmRequest};
pub use local::HashEmbedder;
pub use ollama::{OllamaEmbedder, OllamaLlm, OllamaProvider};
pub use reranker::{CrossEncoder, HttpCrossEncoder};

/// Embedding model ids with this prefix select the offline hashing embedder
pub const LOCAL_EMBEDDER_PREFIX: &str = "feature-hash";

static SHARED: OnceCell<Services> = OnceCell::new();

/// The external models one engine talks to
#[derive(Clone)]
pub struct Services {
    pub llm: Arc<dyn LlmProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    /// `None` when no cross-encoder is configured
    pub reranker: Option<Arc<dyn CrossEncoder>>,
}

impl Services {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Option<Arc<dyn CrossEncoder>>,
    ) -> Self {
        Self {
            llm,
            embedder,
            reranker,
        }
    }

    /// Build providers from configuration
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        let mut llm_config = config.llm.clone();
        llm_config.embed_model = config.embeddings.model.clone();

        let (ollama_embedder, llm) =
            OllamaProvider::new(&llm_config, config.embeddings.dimensions)?.split();

        let embedder: Arc<dyn EmbeddingProvider> =
            if config.embeddings.model.starts_with(LOCAL_EMBEDDER_PREFIX) {
                tracing::info!(
                    "Using local hashing embedder ({} dims)",
                    config.embeddings.dimensions
                );
                Arc::new(HashEmbedder::new(config.embeddings.dimensions))
            } else {
                tracing::info!("Using Ollama embedder '{}'", config.embeddings.model);
                Arc::new(ollama_embedder)
            };

        let reranker: Option<Arc<dyn CrossEncoder>> = match HttpCrossEncoder::from_config(&config.reranker)? {
            Some(encoder) => {
                tracing::info!("Cross-encoder reranking enabled");
                Some(Arc::new(encoder))
            }
            None => {
                tracing::info!("No cross-encoder configured, fusion will not rerank");
                None
            }
        };

        Ok(Self {
            llm: Arc::new(llm),
            embedder,
            reranker,
        })
    }
}

/// Process-wide services, built from `config` on first call
///
/// Later calls return the first instance and ignore `config`.
pub fn shared_services(config: &RagConfig) -> Result<&'static Services> {
    SHARED.get_or_try_init(|| Services::from_config(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_embedder_selection() {
        let mut config = RagConfig::default();
        config.embeddings.model = "feature-hash-256".to_string();
        config.embeddings.dimensions = 256;

        let services = Services::from_config(&config).unwrap();
        assert_eq!(services.embedder.model_id(), "feature-hash-256");
        assert!(services.reranker.is_none());
        assert!(services.llm.is_available());
    }

    #[test]
    fn test_shared_services_is_built_once() {
        let config = RagConfig::default();
        let a = shared_services(&config).unwrap() as *const Services;
        let b = shared_services(&config).unwrap() as *const Services;
        assert_eq!(a, b);
    }
}
