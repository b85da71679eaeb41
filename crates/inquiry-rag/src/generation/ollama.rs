//! Ollama HTTP client with retry logic

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::providers::llm::{estimate_tokens, LlmRequest};

/// Ollama API client with automatic retry
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

/// Text and token usage from one generate call
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub tokens_used: u32,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Retry a request with exponential backoff
    ///
    /// Only transport failures are retried; an unreachable server is
    /// reported immediately as `Unavailable`.
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.config.max_retries;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_unavailable() => return Err(e),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < max_retries {
                        let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                        tracing::warn!(
                            "Ollama request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Llm("Unknown error".to_string())))
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.config.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding using Ollama with retry
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let url = url.as_str();

        self.retry_request(|| async move {
            let request = EmbedRequest {
                model: &self.config.embed_model,
                prompt: text,
            };

            let response = self
                .client
                .post(url)
                .json(&request)
                .send()
                .await
                .map_err(|e| transport_error("Embedding", &self.config.base_url, e))?;

            if !response.status().is_success() {
                return Err(Error::Embedding(format!(
                    "Embedding failed: HTTP {}",
                    response.status()
                )));
            }

            let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                Error::Embedding(format!("Failed to parse embedding response: {}", e))
            })?;

            Ok(embed_response.embedding)
        })
        .await
    }

    /// Generate text with retry logic
    pub async fn generate(&self, request: &LlmRequest) -> Result<Generation> {
        let url = format!("{}/api/generate", self.config.base_url);
        let url = url.as_str();
        let temperature = request.temperature.unwrap_or(self.config.temperature);
        let num_predict = request.max_tokens.unwrap_or(self.config.max_tokens);

        tracing::debug!(
            "Generating with model: {} ({} prompt chars)",
            self.config.generate_model,
            request.prompt.len()
        );

        self.retry_request(|| async move {
            let body = GenerateRequest {
                model: &self.config.generate_model,
                prompt: &request.prompt,
                system: request.system_prompt.as_deref(),
                stream: false,
                options: GenerateOptions {
                    temperature,
                    num_predict,
                },
            };

            let response = self
                .client
                .post(url)
                .json(&body)
                .send()
                .await
                .map_err(|e| transport_error("Generation", &self.config.base_url, e))?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                return Err(Error::Llm(format!(
                    "Generation failed: HTTP {} - {}",
                    status, text
                )));
            }

            let generated: GenerateResponse = response.json().await.map_err(|e| {
                Error::Llm(format!("Failed to parse generation response: {}", e))
            })?;

            let tokens_used = match (generated.prompt_eval_count, generated.eval_count) {
                (None, None) => estimate_tokens(&request.prompt) + estimate_tokens(&generated.response),
                (prompt, eval) => prompt.unwrap_or(0) + eval.unwrap_or(0),
            };

            Ok(Generation {
                text: generated.response,
                tokens_used,
            })
        })
        .await
    }
}

fn transport_error(what: &str, base_url: &str, err: reqwest::Error) -> Error {
    if err.is_connect() {
        Error::Unavailable(format!("Ollama at {}: {}", base_url, err))
    } else {
        Error::Llm(format!("{} request failed: {}", what, err))
    }
}
