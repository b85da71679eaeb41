//! Cross-encoder relevance scoring

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::RerankerConfig;
use crate::error::{Error, Result};

/// Batch scalar relevance over (query, passage) pairs
///
/// Each passage gets an independent score; the model never compares
/// passages against each other.
#[async_trait]
pub trait CrossEncoder: Send + Sync {
    /// Score every passage against the query, in input order
    async fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>>;

    /// Whether the model is configured
    fn is_available(&self) -> bool {
        true
    }

    /// Get provider name for logging
    fn name(&self) -> &str;
}

/// Cross-encoder served over HTTP (`POST {base_url}/rerank`)
///
/// Speaks the text-embeddings-inference rerank protocol: request
/// `{query, texts}`, response `[{index, score}]`.
pub struct HttpCrossEncoder {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct RerankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
    raw_scores: bool,
}

#[derive(Deserialize)]
struct RerankItem {
    index: usize,
    score: f32,
}

impl HttpCrossEncoder {
    /// Create from config; returns `None` when no endpoint is configured
    pub fn from_config(config: &RerankerConfig) -> Result<Option<Self>> {
        let Some(base_url) = config.base_url.as_ref().filter(|u| !u.trim().is_empty()) else {
            return Ok(None);
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Reranker(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Some(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }))
    }
}

#[async_trait]
impl CrossEncoder for HttpCrossEncoder {
    async fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        if passages.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/rerank", self.base_url);
        let request = RerankRequest {
            query,
            texts: passages,
            raw_scores: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    Error::Unavailable(format!("reranker at {}: {}", self.base_url, e))
                } else {
                    Error::Reranker(format!("Rerank request failed: {}", e))
                }
            })?;

        if !response.status().is_success() {
            return Err(Error::Reranker(format!(
                "Rerank failed: HTTP {}",
                response.status()
            )));
        }

        let items: Vec<RerankItem> = response
            .json()
            .await
            .map_err(|e| Error::Reranker(format!("Failed to parse rerank response: {}", e)))?;

        let mut scores = vec![f32::NAN; passages.len()];
        for item in items {
            if let Some(slot) = scores.get_mut(item.index) {
                *slot = item.score;
            }
        }

        if scores.iter().any(|s| s.is_nan()) {
            return Err(Error::Reranker(
                "Rerank response did not score every passage".to_string(),
            ));
        }

        Ok(scores)
    }

    fn name(&self) -> &str {
        "http-cross-encoder"
    }
}
