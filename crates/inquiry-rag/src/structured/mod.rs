//! Structured output: JSON extraction, schemas, and the repair loop

pub mod cleanup;
pub mod schema;
mod validator;

pub use cleanup::{extract_json, CleanupPass, DEFAULT_PASSES};
pub use schema::{
    prompt_with_schema, ChatAnswer, EntityList, ExplanationOutput, OutputSchema, QuestionSet,
    QuizConstraints, SummaryOutput, TripleDraft, TripleSet,
};
pub use validator::{parse_and_validate, Structured, StructuredOutputValidator};
