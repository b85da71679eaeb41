//! Ollama-based providers for embeddings and LLM
//!
//! Wraps the shared OllamaClient to implement the provider traits.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::LlmConfig;
use crate::error::Result;
use crate::generation::OllamaClient;

use super::embedding::EmbeddingProvider;
use super::llm::{LlmOutcome, LlmProvider, LlmRequest};

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    dimensions: usize,
    model: String,
}

impl OllamaEmbedder {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>, dimensions: usize) -> Self {
        let model = client.config().embed_model.clone();
        Self {
            client,
            dimensions,
            model,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama LLM provider
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaLlm {
    /// Create from existing OllamaClient
    pub fn from_client(client: Arc<OllamaClient>) -> Self {
        let model = client.config().generate_model.clone();
        Self { client, model }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate(&self, request: &LlmRequest) -> LlmOutcome {
        match self.client.generate(request).await {
            Ok(generation) => LlmOutcome::Completed {
                text: generation.text,
                tokens_used: generation.tokens_used,
            },
            Err(e) if e.is_unavailable() => LlmOutcome::Unavailable {
                reason: e.to_string(),
            },
            Err(e) => LlmOutcome::ProviderError {
                message: e.to_string(),
            },
        }
    }

    fn is_available(&self) -> bool {
        !self.client.config().base_url.trim().is_empty() && !self.model.trim().is_empty()
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Combined Ollama provider that shares a single client for both embeddings and LLM
pub struct OllamaProvider {
    embedder: OllamaEmbedder,
    llm: OllamaLlm,
}

impl OllamaProvider {
    /// Create a new combined Ollama provider
    pub fn new(config: &LlmConfig, dimensions: usize) -> Result<Self> {
        let client = Arc::new(OllamaClient::new(config)?);
        Ok(Self {
            embedder: OllamaEmbedder::from_client(Arc::clone(&client), dimensions),
            llm: OllamaLlm::from_client(client),
        })
    }

    /// Split into separate providers
    pub fn split(self) -> (OllamaEmbedder, OllamaLlm) {
        (self.embedder, self.llm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_follows_config() {
        let provider = OllamaProvider::new(&LlmConfig::default(), 768).unwrap();
        let (embedder, llm) = provider.split();
        assert!(llm.is_available());
        assert_eq!(llm.model(), "qwen2.5:7b");
        assert_eq!(embedder.model_id(), "nomic-embed-text");

        let config = LlmConfig {
            base_url: String::new(),
            ..LlmConfig::default()
        };
        let (_, llm) = OllamaProvider::new(&config, 768).unwrap().split();
        assert!(!llm.is_available());
    }
}
