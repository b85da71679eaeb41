//! Parse, validate, and repair structured model output
//!
//! PARSE -> VALIDATE -> (ACCEPT | REPAIR -> PARSE) -> (ACCEPT | FAIL).
//! Repair attempts run strictly one after another. Every model call carries
//! its own timeout, and a timeout counts as a failed attempt.

use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::providers::llm::{generate_with_timeout, LlmOutcome, LlmProvider, LlmRequest};

use super::cleanup::extract_json;
use super::schema::OutputSchema;

/// An accepted structured value with bookkeeping about how it was obtained
#[derive(Debug, Clone)]
pub struct Structured<T> {
    pub value: T,
    /// Raw text of the accepted attempt
    pub raw: String,
    /// Attempts made, including the accepted one
    pub attempts: u32,
    /// Correction round-trips issued
    pub repair_calls: u32,
    /// Tokens across every call made for this value
    pub tokens_used: u32,
}

/// Why one attempt failed
enum AttemptFailure {
    /// Text came back but did not fit the schema
    Invalid {
        raw: String,
        parsed: Option<Value>,
        error: String,
    },
    /// The call itself failed or timed out
    Call(String),
}

/// Parse model text into `T`, applying the bare-list coercion and checks
///
/// Returns the parsed JSON alongside the error so repair prompts can show it.
pub fn parse_and_validate<T, F>(raw: &str, extra: &F) -> std::result::Result<T, (Option<Value>, String)>
where
    T: OutputSchema,
    F: Fn(&T) -> std::result::Result<(), String> + ?Sized,
{
    let extracted = extract_json(raw).map_err(|e| (None, e))?;
    let mut value = extracted.value;

    if let (Value::Array(_), Some(field)) = (&value, T::container_field()) {
        let mut wrapper = serde_json::Map::new();
        wrapper.insert(field.to_string(), value);
        value = Value::Object(wrapper);
    }

    let parsed: T = serde_json::from_value(value.clone())
        .map_err(|e| (Some(value.clone()), format!("schema mismatch: {}", e)))?;

    parsed
        .check()
        .and_then(|_| extra(&parsed))
        .map_err(|e| (Some(value), e))?;

    Ok(parsed)
}

/// Runs structured model calls with bounded repair
pub struct StructuredOutputValidator {
    llm: Arc<dyn LlmProvider>,
    max_retries: u32,
    call_timeout: Duration,
    repair_calls_total: AtomicU64,
}

impl StructuredOutputValidator {
    pub fn new(llm: Arc<dyn LlmProvider>, max_retries: u32, call_timeout: Duration) -> Self {
        Self {
            llm,
            max_retries,
            call_timeout,
            repair_calls_total: AtomicU64::new(0),
        }
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Correction round-trips issued over this validator's lifetime
    pub fn repair_calls_total(&self) -> u64 {
        self.repair_calls_total.load(Ordering::Relaxed)
    }

    /// Call the model and return a schema-conforming value
    pub async fn generate<T: OutputSchema>(&self, request: &LlmRequest) -> Result<Structured<T>> {
        self.generate_checked(request, |_: &T| Ok(())).await
    }

    /// Like [`generate`](Self::generate), with an extra per-request check
    pub async fn generate_checked<T, F>(&self, request: &LlmRequest, extra: F) -> Result<Structured<T>>
    where
        T: OutputSchema,
        F: Fn(&T) -> std::result::Result<(), String> + Send + Sync,
    {
        let first = generate_with_timeout(self.llm.as_ref(), request, self.call_timeout).await;
        let (raw, tokens) = match first {
            LlmOutcome::Completed { text, tokens_used } => (Some(text), tokens_used),
            LlmOutcome::Unavailable { reason } => return Err(Error::Unavailable(reason)),
            LlmOutcome::ProviderError { message } => {
                tracing::warn!("Structured call failed on first attempt: {}", message);
                (None, 0)
            }
        };

        let initial = match raw {
            Some(text) => Ok(text),
            None => Err("model call failed".to_string()),
        };
        self.run(request, initial, tokens, &extra).await
    }

    /// Validate text already produced by the model, repairing on failure
    pub async fn validate_or_repair<T, F>(
        &self,
        raw: String,
        request: &LlmRequest,
        extra: F,
    ) -> Result<Structured<T>>
    where
        T: OutputSchema,
        F: Fn(&T) -> std::result::Result<(), String> + Send + Sync,
    {
        self.run(request, Ok(raw), 0, &extra).await
    }

    async fn run<T, F>(
        &self,
        request: &LlmRequest,
        initial: std::result::Result<String, String>,
        mut tokens_used: u32,
        extra: &F,
    ) -> Result<Structured<T>>
    where
        T: OutputSchema,
        F: Fn(&T) -> std::result::Result<(), String> + Send + Sync,
    {
        let total_attempts = self.max_retries + 1;
        let mut current = initial;
        let mut last_raw: Option<String> = None;

        for attempt in 1..=total_attempts {
            let failure = match current {
                Ok(raw) => match parse_and_validate::<T, F>(&raw, extra) {
                    Ok(value) => {
                        if attempt > 1 {
                            tracing::info!(
                                "Structured output accepted after {} attempt(s)",
                                attempt
                            );
                        }
                        return Ok(Structured {
                            value,
                            raw,
                            attempts: attempt,
                            repair_calls: attempt - 1,
                            tokens_used,
                        });
                    }
                    Err((parsed, error)) => AttemptFailure::Invalid { raw, parsed, error },
                },
                Err(message) => AttemptFailure::Call(message),
            };

            let reason = match &failure {
                AttemptFailure::Invalid { error, .. } => error.clone(),
                AttemptFailure::Call(message) => message.clone(),
            };
            tracing::warn!(
                "Structured output rejected (attempt {}/{}): {}",
                attempt,
                total_attempts,
                reason
            );

            if let AttemptFailure::Invalid { raw, .. } = &failure {
                last_raw = Some(raw.clone());
            }

            if attempt == total_attempts {
                return Err(match last_raw {
                    Some(last_raw) => Error::StructuredOutput {
                        message: reason,
                        last_raw,
                        attempts: attempt,
                    },
                    None => Error::Llm(format!(
                        "no usable output after {} attempt(s): {}",
                        attempt, reason
                    )),
                });
            }

            let retry = match &failure {
                AttemptFailure::Invalid { raw, parsed, error } => {
                    self.correction_request::<T>(request, raw, parsed.as_ref(), error)
                }
                AttemptFailure::Call(_) => request.clone(),
            };

            self.repair_calls_total.fetch_add(1, Ordering::Relaxed);
            current = match generate_with_timeout(self.llm.as_ref(), &retry, self.call_timeout).await
            {
                LlmOutcome::Completed { text, tokens_used: t } => {
                    tokens_used += t;
                    Ok(text)
                }
                LlmOutcome::Unavailable { reason } => return Err(Error::Unavailable(reason)),
                LlmOutcome::ProviderError { message } => Err(message),
            };
        }

        Err(Error::internal("repair loop exited without a result"))
    }

    /// Build a correction prompt showing the invalid payload, the error, and the schema
    fn correction_request<T: OutputSchema>(
        &self,
        original: &LlmRequest,
        raw: &str,
        parsed: Option<&Value>,
        error: &str,
    ) -> LlmRequest {
        let schema = T::output_schema_pretty();
        let payload = parsed
            .and_then(|v| serde_json::to_string_pretty(v).ok())
            .unwrap_or_else(|| raw.to_string());

        let prompt = format!(
            "Fix the following JSON output so that it matches the required schema.\n\n\
             Original output:\n```json\n{}\n```\n\n\
             Validation error:\n{}\n\n\
             Fix the output according to this JSON Schema:\n```json\n{}\n```\n\n\
             Return only valid JSON that matches the schema, with no explanation or commentary.",
            payload, error, schema
        );

        LlmRequest {
            prompt,
            system_prompt: Some(format!(
                "You must fix the previous output so it conforms to this JSON Schema: {}",
                schema
            )),
            max_tokens: original.max_tokens,
            temperature: original.temperature,
        }
    }
}
