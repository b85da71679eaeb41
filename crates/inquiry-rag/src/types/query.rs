//! Request types for the orchestrator pipelines

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;

use super::conversation::{normalize_history, Turn};
use super::quiz::{Difficulty, QuestionType};

/// Chat request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message as typed
    pub query: String,

    /// Document in scope; `None` means answer from model knowledge
    #[serde(default)]
    pub document_id: Option<Uuid>,

    /// Prior turns, oldest first
    #[serde(default)]
    pub history: Vec<Turn>,
}

impl ChatRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_document(mut self, document_id: Uuid) -> Self {
        self.document_id = Some(document_id);
        self
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    /// Accept history in any of the loose shapes stored by callers
    pub fn with_raw_history(mut self, entries: &[Value]) -> Result<Self> {
        self.history = normalize_history(entries)?;
        Ok(self)
    }
}

/// Quiz generation request
///
/// Explicit fields take precedence over constraints extracted from
/// `user_query`, which in turn take precedence over configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizRequest {
    /// Free-form request, e.g. "5 hard questions about list comprehensions"
    pub user_query: String,

    #[serde(default)]
    pub document_id: Option<Uuid>,

    #[serde(default)]
    pub question_count: Option<u32>,

    #[serde(default)]
    pub question_types: Option<Vec<QuestionType>>,

    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl QuizRequest {
    pub fn new(user_query: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            ..Default::default()
        }
    }

    pub fn with_document(mut self, document_id: Uuid) -> Self {
        self.document_id = Some(document_id);
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.question_count = Some(count);
        self
    }

    pub fn with_types(mut self, types: Vec<QuestionType>) -> Self {
        self.question_types = Some(types);
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = Some(difficulty);
        self
    }
}

/// How long a summary should be, relative to the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLength {
    Short,
    #[default]
    Medium,
    Long,
}

impl SummaryLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryLength::Short => "short",
            SummaryLength::Medium => "medium",
            SummaryLength::Long => "long",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "short" | "brief" => Some(SummaryLength::Short),
            "medium" => Some(SummaryLength::Medium),
            "long" | "detailed" => Some(SummaryLength::Long),
            _ => None,
        }
    }
}

/// Summary request; a document is required
///
/// Unset options take the configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub document_id: Option<Uuid>,

    #[serde(default)]
    pub length: Option<SummaryLength>,

    /// Ask for a structured outline alongside the summary
    #[serde(default)]
    pub include_outline: Option<bool>,
}

impl SummaryRequest {
    pub fn for_document(document_id: Uuid) -> Self {
        Self {
            document_id: Some(document_id),
            ..Default::default()
        }
    }

    pub fn with_length(mut self, length: SummaryLength) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_outline(mut self, include_outline: bool) -> Self {
        self.include_outline = Some(include_outline);
        self
    }
}

/// Request to explain why a quiz answer was wrong
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExplanationRequest {
    /// The question as shown to the learner
    pub question: String,
    /// What the learner answered
    pub wrong_answer: String,
    pub correct_answer: String,

    /// Document the question came from; `None` explains from model knowledge
    #[serde(default)]
    pub document_id: Option<Uuid>,
}

impl ExplanationRequest {
    pub fn new(
        question: impl Into<String>,
        wrong_answer: impl Into<String>,
        correct_answer: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            wrong_answer: wrong_answer.into(),
            correct_answer: correct_answer.into(),
            document_id: None,
        }
    }

    pub fn with_document(mut self, document_id: Uuid) -> Self {
        self.document_id = Some(document_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quiz_request_deserialize() {
        let req: QuizRequest = serde_json::from_value(json!({
            "user_query": "questions about tuples",
            "question_count": 2,
            "question_types": ["MC", "TF"]
        }))
        .unwrap();

        assert_eq!(req.question_count, Some(2));
        assert_eq!(
            req.question_types,
            Some(vec![QuestionType::SingleChoice, QuestionType::TrueFalse])
        );
        assert!(req.difficulty.is_none());
    }

    #[test]
    fn test_chat_request_raw_history() {
        let req = ChatRequest::new("what about tuples?")
            .with_raw_history(&[json!({"is_user": true, "content": "what is a list?"})])
            .unwrap();
        assert_eq!(req.history.len(), 1);
    }

    #[test]
    fn test_summary_request_deserialize() {
        let req: SummaryRequest = serde_json::from_value(json!({
            "document_id": "67e55044-10b1-426f-9247-bb680e5fe0c8",
            "length": "short"
        }))
        .unwrap();

        assert_eq!(req.length, Some(SummaryLength::Short));
        assert_eq!(req.include_outline, None);
        assert_eq!(SummaryLength::parse(" Detailed "), Some(SummaryLength::Long));
        assert_eq!(SummaryLength::parse("huge"), None);
    }
}
