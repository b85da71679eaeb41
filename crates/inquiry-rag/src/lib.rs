//! inquiry-rag: retrieval-augmented chat, quiz generation, summarization, and
//! wrong-answer explanations
//!
//! Passages come from three retrieval sources (BM25, dense embeddings, and a
//! knowledge graph), are fused and reranked with a cross-encoder, and feed
//! prompts whose structured output is validated and repaired before use.
//! Conversation history is rewritten and compressed to keep context bounded.

pub mod config;
pub mod error;
pub mod generation;
pub mod history;
pub mod ingestion;
pub mod orchestrator;
pub mod providers;
pub mod retrieval;
pub mod storage;
pub mod structured;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use orchestrator::RagEngine;
pub use providers::{shared_services, Services};
pub use types::{
    ChatRequest, ChatResponse, Chunk, Document, ExplanationRequest, ExplanationResponse,
    QuizRequest, QuizResponse, RetrievedPassage, SummaryLength, SummaryRequest, SummaryResponse,
    Turn,
};
