//! Orchestrator response payloads
//!
//! Every payload either carries a result or sets `error` and `error_kind`;
//! there is no empty success.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

use super::passage::{RetrievalSource, RetrievedPassage};
use super::query::SummaryLength;
use super::quiz::Quiz;

/// A passage that informed an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub chunk_id: Uuid,
    pub document_id: Uuid,
    pub ordinal: u32,
    pub text: String,
    /// Fused relevance score
    pub score: f32,
    pub sources: Vec<RetrievalSource>,
}

impl From<&RetrievedPassage> for SourceRef {
    fn from(passage: &RetrievedPassage) -> Self {
        Self {
            chunk_id: passage.chunk.id,
            document_id: passage.chunk.document_id,
            ordinal: passage.chunk.ordinal,
            text: passage.chunk.text.clone(),
            score: passage.score,
            sources: passage.sources.iter().copied().collect(),
        }
    }
}

/// Chat response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
    /// No passages informed the answer
    pub is_generic_answer: bool,
    /// The query as the user typed it
    pub original_query: String,
    /// Standalone form used for retrieval, when it differs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten_query: Option<String>,
    /// Tokens across every model call made for this request
    pub tokens_used: u32,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl ChatResponse {
    pub fn failed(original_query: impl Into<String>, err: &Error) -> Self {
        Self {
            original_query: original_query.into(),
            error: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Quiz response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz: Option<Quiz>,
    /// Topic the questions were generated for
    pub topic: String,
    pub tokens_used: u32,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl QuizResponse {
    pub fn failed(topic: impl Into<String>, err: &Error) -> Self {
        Self {
            topic: topic.into(),
            error: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Summary response
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
    /// Section headings with key points, when an outline was requested
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outline: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Uuid>,
    /// Length the summary was written for
    pub length: SummaryLength,
    pub tokens_used: u32,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl SummaryResponse {
    pub fn failed(document_id: Option<Uuid>, err: &Error) -> Self {
        Self {
            document_id,
            error: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Explanation of a wrong quiz answer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExplanationResponse {
    pub explanation: String,
    pub sources: Vec<SourceRef>,
    pub tokens_used: u32,
    pub processing_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl ExplanationResponse {
    pub fn failed(err: &Error) -> Self {
        Self {
            error: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
