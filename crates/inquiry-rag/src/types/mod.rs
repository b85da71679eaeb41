//! Core types for the RAG system

pub mod conversation;
pub mod document;
pub mod passage;
pub mod query;
pub mod quiz;
pub mod response;

pub use conversation::{normalize_history, Role, Turn};
pub use document::{Chunk, Document, GraphTriple};
pub use passage::{RetrievalSource, RetrievedPassage};
pub use query::{ChatRequest, ExplanationRequest, QuizRequest, SummaryLength, SummaryRequest};
pub use quiz::{
    CorrectAnswer, Difficulty, Question, QuestionDraft, QuestionOption, QuestionType, Quiz,
};
pub use response::{
    ChatResponse, ExplanationResponse, QuizResponse, SourceRef, SummaryResponse,
};
