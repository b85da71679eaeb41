//! Configuration for the RAG core

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{Difficulty, QuestionType, RetrievalSource, SummaryLength};

/// Main RAG configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Language-model (Ollama) configuration
    pub llm: LlmConfig,
    /// Cross-encoder service configuration
    pub reranker: RerankerConfig,
    /// Retrieval fusion configuration
    pub retrieval: RetrievalConfig,
    /// Structured output repair configuration
    pub structured: StructuredOutputConfig,
    /// Conversation history configuration
    pub history: HistoryConfig,
    /// Quiz defaults
    pub quiz: QuizConfig,
    /// Summary configuration
    pub summary: SummaryConfig,
    /// Storage locations
    pub storage: StorageConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file; missing fields take defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: RagConfig = toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would break chunking or fusion invariants
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be > 0".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(
                "chunking.chunk_overlap must be smaller than chunk_size".to_string(),
            ));
        }
        if self.retrieval.final_k == 0 {
            return Err(Error::Config("retrieval.final_k must be > 0".to_string()));
        }
        if self.retrieval.candidate_k < self.retrieval.final_k {
            return Err(Error::Config(
                "retrieval.candidate_k must be >= final_k".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.history.rewrite_min_ratio) {
            return Err(Error::Config(
                "history.rewrite_min_ratio must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model identifier, recorded with every persisted index
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Default sampling temperature
    pub temperature: f32,
    /// Default generation budget in tokens
    pub max_tokens: u32,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Transport-level retries for failed HTTP requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "qwen2.5:7b".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Cross-encoder (rerank) service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    /// Base URL of a `/rerank` endpoint; `None` disables reranking
    pub base_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 30,
        }
    }
}

/// Retrieval fusion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates requested from each retriever
    pub candidate_k: usize,
    /// Passages returned after reranking
    pub final_k: usize,
    /// Multiplicative boost for authoritative sources (0.05 = +5%)
    pub authoritative_boost: f32,
    /// Sources treated as authoritative when a document is in scope
    pub authoritative_sources: Vec<RetrievalSource>,
    /// Maximum chunks returned by the graph retriever
    pub graph_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_k: 10,
            final_k: 5,
            authoritative_boost: 0.05,
            authoritative_sources: vec![RetrievalSource::Dense],
            graph_limit: 5,
        }
    }
}

/// Structured output repair configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredOutputConfig {
    /// Repair round-trips after the first attempt
    pub max_retries: u32,
}

impl Default for StructuredOutputConfig {
    fn default() -> Self {
        Self { max_retries: 2 }
    }
}

/// Conversation history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Number of most recent turns always kept verbatim
    pub recency_threshold: usize,
    /// Older turns whose combined size fits this budget are kept verbatim
    pub verbatim_char_budget: usize,
    /// Minimum rewrite length as a fraction of the original query
    pub rewrite_min_ratio: f32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            recency_threshold: 4,
            verbatim_char_budget: 1200,
            rewrite_min_ratio: 0.5,
        }
    }
}

/// Quiz generation defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    pub default_question_count: u32,
    pub default_question_types: Vec<QuestionType>,
    pub default_difficulty: Difficulty,
    /// Hard ceiling on questions per generation run
    pub max_question_count: u32,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            default_question_count: 5,
            default_question_types: vec![QuestionType::SingleChoice, QuestionType::TrueFalse],
            default_difficulty: Difficulty::Medium,
            max_question_count: 20,
        }
    }
}

/// Summary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Document content beyond this many characters is cut before prompting
    pub max_input_chars: usize,
    /// Length used when a request names none
    pub default_length: SummaryLength,
    /// Whether summaries carry an outline unless the request says otherwise
    pub include_outline: bool,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 24_000,
            default_length: SummaryLength::Medium,
            include_outline: false,
        }
    }
}

/// Storage locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding documents, chunks, quizzes and conversations
    pub database_path: PathBuf,
    /// Root directory for per-document vector indices
    pub index_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let root = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("inquiry-rag");

        Self {
            database_path: root.join("inquiry.db"),
            index_dir: root.join("indices"),
        }
    }
}
