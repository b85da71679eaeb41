//! Error types for the RAG core

use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG core errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Vector index error
    #[error("Vector index error: {0}")]
    VectorIndex(String),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Cross-encoder error
    #[error("Reranker error: {0}")]
    Reranker(String),

    /// Graph store error
    #[error("Graph store error: {0}")]
    Graph(String),

    /// A dependency is not configured or not reachable
    #[error("Dependency unavailable: {0}")]
    Unavailable(String),

    /// Caller violated a precondition (never retried)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Model output could not be coerced into the expected schema
    #[error("Malformed model output after {attempts} attempt(s): {message}")]
    StructuredOutput {
        message: String,
        last_raw: String,
        attempts: u32,
    },

    /// Relational store error
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a vector index error
    pub fn vector_index(message: impl Into<String>) -> Self {
        Self::VectorIndex(message.into())
    }

    /// Create an LLM error
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm(message.into())
    }

    /// Create an unavailable-dependency error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create a precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Create a persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Short machine-readable category, surfaced in orchestrator payloads
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::Embedding(_) => "embedding_error",
            Error::VectorIndex(_) => "vector_index_error",
            Error::Llm(_) => "llm_error",
            Error::Reranker(_) => "reranker_error",
            Error::Graph(_) => "graph_error",
            Error::Unavailable(_) => "unavailable",
            Error::Precondition(_) => "precondition_failed",
            Error::DocumentNotFound(_) => "not_found",
            Error::StructuredOutput { .. } => "malformed_output",
            Error::Persistence(_) => "persistence_error",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Whether the error means a dependency is missing rather than broken
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Unavailable(_))
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}
