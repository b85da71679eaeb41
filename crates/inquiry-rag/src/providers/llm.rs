//! LLM provider trait for text generation

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Error, Result};

/// One generation call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    /// Overrides the provider's default budget
    pub max_tokens: Option<u32>,
    /// Overrides the provider's default temperature
    pub temperature: Option<f32>,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Result of a generation call
///
/// Providers never raise for expected failures; callers match on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmOutcome {
    /// Text produced, with a usage estimate
    Completed { text: String, tokens_used: u32 },
    /// No model is configured or reachable
    Unavailable { reason: String },
    /// The provider answered with an error, or the call timed out
    ProviderError { message: String },
}

impl LlmOutcome {
    /// Convert into a `Result`, keeping availability distinct from failure
    pub fn into_result(self) -> Result<(String, u32)> {
        match self {
            LlmOutcome::Completed { text, tokens_used } => Ok((text, tokens_used)),
            LlmOutcome::Unavailable { reason } => Err(Error::Unavailable(reason)),
            LlmOutcome::ProviderError { message } => Err(Error::Llm(message)),
        }
    }

    pub fn tokens_used(&self) -> u32 {
        match self {
            LlmOutcome::Completed { tokens_used, .. } => *tokens_used,
            _ => 0,
        }
    }
}

/// Trait for LLM-based text generation
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (`/api/generate`)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate text for a prompt
    async fn generate(&self, request: &LlmRequest) -> LlmOutcome;

    /// Whether a model is configured; checked before any call is attempted
    fn is_available(&self) -> bool;

    /// Check if the provider is healthy and reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}

/// Run one generation call under a deadline
///
/// A timeout is reported as `ProviderError` so callers count it as a failed
/// attempt.
pub async fn generate_with_timeout(
    llm: &dyn LlmProvider,
    request: &LlmRequest,
    timeout: Duration,
) -> LlmOutcome {
    if !llm.is_available() {
        return LlmOutcome::Unavailable {
            reason: format!("LLM provider '{}' is not configured", llm.name()),
        };
    }

    match tokio::time::timeout(timeout, llm.generate(request)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!(
                "LLM call to {} timed out after {:?}",
                llm.name(),
                timeout
            );
            LlmOutcome::ProviderError {
                message: format!("generation timed out after {}s", timeout.as_secs_f32()),
            }
        }
    }
}

/// Rough token estimate for providers that report no usage
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count() as u32;
    (chars + 3) / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowLlm;

    #[async_trait]
    impl LlmProvider for SlowLlm {
        async fn generate(&self, _request: &LlmRequest) -> LlmOutcome {
            tokio::time::sleep(Duration::from_secs(5)).await;
            LlmOutcome::Completed {
                text: "late".to_string(),
                tokens_used: 1,
            }
        }

        fn is_available(&self) -> bool {
            true
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "slow-1"
        }
    }

    #[tokio::test]
    async fn test_timeout_is_provider_error() {
        let outcome = generate_with_timeout(
            &SlowLlm,
            &LlmRequest::new("hi"),
            Duration::from_millis(20),
        )
        .await;
        assert!(matches!(outcome, LlmOutcome::ProviderError { .. }));
    }

    #[test]
    fn test_into_result_keeps_unavailable() {
        let err = LlmOutcome::Unavailable {
            reason: "no model".to_string(),
        }
        .into_result()
        .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
