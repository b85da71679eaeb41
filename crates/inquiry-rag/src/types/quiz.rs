//! Quiz and question types

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Question type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum QuestionType {
    /// Single choice
    #[serde(rename = "MC", alias = "mc")]
    SingleChoice,
    /// Multiple choice (several correct options)
    #[serde(rename = "MCM", alias = "mcm")]
    MultipleChoice,
    /// True / false
    #[serde(rename = "TF", alias = "tf")]
    TrueFalse,
    /// Fill in the blank
    #[serde(rename = "FB", alias = "fb")]
    FillBlank,
    /// Short answer
    #[serde(rename = "SA", alias = "sa")]
    ShortAnswer,
}

impl QuestionType {
    pub const ALL: [QuestionType; 5] = [
        QuestionType::SingleChoice,
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::FillBlank,
        QuestionType::ShortAnswer,
    ];

    /// Short code stored in the database and used in prompts
    pub fn code(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "MC",
            QuestionType::MultipleChoice => "MCM",
            QuestionType::TrueFalse => "TF",
            QuestionType::FillBlank => "FB",
            QuestionType::ShortAnswer => "SA",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let upper = code.trim().to_uppercase();
        Self::ALL.into_iter().find(|t| t.code() == upper)
    }

    /// Human-readable name for prompt text
    pub fn describe(&self) -> &'static str {
        match self {
            QuestionType::SingleChoice => "single choice",
            QuestionType::MultipleChoice => "multiple choice",
            QuestionType::TrueFalse => "true/false",
            QuestionType::FillBlank => "fill in the blank",
            QuestionType::ShortAnswer => "short answer",
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            QuestionType::SingleChoice | QuestionType::MultipleChoice
        )
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Quiz difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[serde(alias = "Easy", alias = "EASY")]
    Easy,
    #[default]
    #[serde(alias = "Medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "Hard", alias = "HARD")]
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "normal" => Some(Difficulty::Medium),
            "hard" | "difficult" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// One answer option; models emit either plain strings or `{id, text}` objects
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
}

impl<'de> Deserialize<'de> for QuestionOption {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawOption {
            Text(String),
            Object {
                #[serde(default)]
                id: Option<String>,
                #[serde(alias = "content", alias = "label")]
                text: String,
            },
        }

        Ok(match RawOption::deserialize(deserializer)? {
            RawOption::Text(text) => QuestionOption {
                id: String::new(),
                text,
            },
            RawOption::Object { id, text } => QuestionOption {
                id: id.unwrap_or_default(),
                text,
            },
        })
    }
}

/// Give letter ids (A, B, ...) to options that arrived without one
pub fn assign_option_ids(options: &mut [QuestionOption]) {
    for (i, option) in options.iter_mut().enumerate() {
        if option.id.trim().is_empty() {
            option.id = option_letter(i);
        }
    }
}

fn option_letter(index: usize) -> String {
    match u8::try_from(index) {
        Ok(i) if i < 26 => ((b'A' + i) as char).to_string(),
        _ => (index + 1).to_string(),
    }
}

/// A correct answer: one value or a list (multi-choice)
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Single(String),
    Multiple(Vec<String>),
}

impl CorrectAnswer {
    pub fn values(&self) -> Vec<&str> {
        match self {
            CorrectAnswer::Single(s) => vec![s.as_str()],
            CorrectAnswer::Multiple(v) => v.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values().iter().all(|v| v.trim().is_empty())
    }
}

impl<'de> Deserialize<'de> for CorrectAnswer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::String(s) => Ok(CorrectAnswer::Single(s)),
            Value::Bool(b) => Ok(CorrectAnswer::Single(b.to_string())),
            Value::Number(n) => Ok(CorrectAnswer::Single(n.to_string())),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s),
                    Value::Bool(b) => Ok(b.to_string()),
                    Value::Number(n) => Ok(n.to_string()),
                    other => Err(serde::de::Error::custom(format!(
                        "correct_answer list items must be strings, got {}",
                        other
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(CorrectAnswer::Multiple),
            other => Err(serde::de::Error::custom(format!(
                "correct_answer must be a string or list, got {}",
                other
            ))),
        }
    }
}

const TRUE_WORDS: &[&str] = &["true", "t", "yes", "correct", "正确", "对"];
const FALSE_WORDS: &[&str] = &["false", "f", "no", "incorrect", "错误", "错"];

/// A question as emitted by the model, before it belongs to a quiz
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuestionDraft {
    pub content: String,
    #[serde(alias = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    pub correct_answer: CorrectAnswer,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub knowledge_points: Vec<String>,
}

impl QuestionDraft {
    /// Per-type shape checks beyond what deserialization enforces
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.content.trim().is_empty() {
            return Err("question content is empty".to_string());
        }
        if self.correct_answer.is_empty() {
            return Err(format!("question '{}' has no correct answer", self.content));
        }

        match self.question_type {
            QuestionType::SingleChoice | QuestionType::MultipleChoice => {
                if self.options.len() < 2 {
                    return Err(format!(
                        "{} question '{}' needs at least 2 options",
                        self.question_type, self.content
                    ));
                }
                if self.question_type == QuestionType::MultipleChoice
                    && !matches!(self.correct_answer, CorrectAnswer::Multiple(_))
                {
                    return Err(format!(
                        "MCM question '{}' must list its correct answers",
                        self.content
                    ));
                }
                if self.question_type == QuestionType::SingleChoice
                    && self.correct_answer.values().len() != 1
                {
                    return Err(format!(
                        "MC question '{}' must have exactly one correct answer",
                        self.content
                    ));
                }
                for answer in self.correct_answer.values() {
                    if !self.option_matches(answer) {
                        return Err(format!(
                            "answer '{}' does not match any option of '{}'",
                            answer, self.content
                        ));
                    }
                }
            }
            QuestionType::TrueFalse => {
                let values = self.correct_answer.values();
                let word = values.first().map(|v| v.trim().to_lowercase());
                let ok = values.len() == 1
                    && word.as_deref().map_or(false, |w| {
                        TRUE_WORDS.contains(&w) || FALSE_WORDS.contains(&w)
                    });
                if !ok {
                    return Err(format!(
                        "TF question '{}' must answer true or false",
                        self.content
                    ));
                }
            }
            QuestionType::FillBlank | QuestionType::ShortAnswer => {}
        }

        Ok(())
    }

    fn option_matches(&self, answer: &str) -> bool {
        let answer = answer.trim();
        self.options.iter().enumerate().any(|(i, o)| {
            let id = if o.id.is_empty() {
                option_letter(i)
            } else {
                o.id.clone()
            };
            id.eq_ignore_ascii_case(answer) || o.text.trim() == answer
        })
    }
}

/// A persisted question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub quiz_id: Uuid,
    /// 1-based position within the quiz
    pub order: u32,
    pub question_type: QuestionType,
    pub content: String,
    pub options: Vec<QuestionOption>,
    pub correct_answer: CorrectAnswer,
    pub explanation: String,
    pub difficulty: Difficulty,
    pub knowledge_points: Vec<String>,
}

impl Question {
    fn from_draft(draft: QuestionDraft, quiz_id: Uuid, order: u32, fallback: Difficulty) -> Self {
        let mut options = draft.options;
        assign_option_ids(&mut options);

        let correct_answer = match (draft.question_type, draft.correct_answer) {
            (QuestionType::TrueFalse, CorrectAnswer::Single(s)) => {
                let lower = s.trim().to_lowercase();
                CorrectAnswer::Single(if TRUE_WORDS.contains(&lower.as_str()) {
                    "true".to_string()
                } else {
                    "false".to_string()
                })
            }
            (_, answer) => answer,
        };

        Self {
            id: Uuid::new_v4(),
            quiz_id,
            order,
            question_type: draft.question_type,
            content: draft.content,
            options,
            correct_answer,
            explanation: draft.explanation,
            difficulty: draft.difficulty.unwrap_or(fallback),
            knowledge_points: draft.knowledge_points,
        }
    }
}

/// A generated quiz with its questions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub document_id: Option<Uuid>,
    pub difficulty: Difficulty,
    pub total_questions: u32,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
}

impl Quiz {
    /// Build a quiz from validated drafts, numbering questions 1..N
    pub fn assemble(
        title: impl Into<String>,
        document_id: Option<Uuid>,
        difficulty: Difficulty,
        drafts: Vec<QuestionDraft>,
    ) -> Self {
        let id = Uuid::new_v4();
        let questions: Vec<Question> = drafts
            .into_iter()
            .enumerate()
            .map(|(i, d)| Question::from_draft(d, id, i as u32 + 1, difficulty))
            .collect();

        Self {
            id,
            title: title.into(),
            document_id,
            difficulty,
            total_questions: questions.len() as u32,
            questions,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(value: Value) -> QuestionDraft {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_type_alias_and_string_options() {
        let q = draft(json!({
            "content": "Which type is mutable?",
            "type": "MC",
            "options": ["tuple", "list", "str"],
            "correct_answer": "B",
            "explanation": "Lists can be changed in place."
        }));
        assert_eq!(q.question_type, QuestionType::SingleChoice);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_mcm_requires_list_answer() {
        let q = draft(json!({
            "content": "Which are sequences?",
            "question_type": "MCM",
            "options": [{"id": "A", "text": "list"}, {"id": "B", "text": "tuple"}],
            "correct_answer": "A"
        }));
        assert!(q.validate().is_err());
    }

    #[test]
    fn test_tf_accepts_bool_answer() {
        let q = draft(json!({
            "content": "Python lists can hold mixed types.",
            "question_type": "TF",
            "correct_answer": true
        }));
        assert!(q.validate().is_ok());

        let quiz = Quiz::assemble("Lists", None, Difficulty::Easy, vec![q]);
        assert_eq!(
            quiz.questions[0].correct_answer,
            CorrectAnswer::Single("true".to_string())
        );
    }

    #[test]
    fn test_assemble_numbers_questions() {
        let drafts = (0..3)
            .map(|i| {
                draft(json!({
                    "content": format!("Question {}", i),
                    "question_type": "SA",
                    "correct_answer": "anything"
                }))
            })
            .collect();
        let quiz = Quiz::assemble("Title", None, Difficulty::Medium, drafts);

        assert_eq!(quiz.total_questions, 3);
        let orders: Vec<u32> = quiz.questions.iter().map(|q| q.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert!(quiz.questions.iter().all(|q| q.quiz_id == quiz.id));
    }

    #[test]
    fn test_option_ids_assigned() {
        let mut options: Vec<QuestionOption> =
            serde_json::from_value(json!(["a", {"id": "X", "text": "b"}, "c"])).unwrap();
        assign_option_ids(&mut options);
        let ids: Vec<&str> = options.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["A", "X", "C"]);
    }
}
