//! Output schemas for structured model calls

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Difficulty, QuestionDraft, QuestionType};

/// A type the model is asked to emit as JSON
pub trait OutputSchema: DeserializeOwned + Serialize + JsonSchema + Send {
    /// For objects with a single list field: that field's name, so a bare
    /// list from the model can be wrapped into it
    fn container_field() -> Option<&'static str> {
        None
    }

    /// Semantic checks beyond the JSON shape
    fn check(&self) -> Result<(), String> {
        Ok(())
    }

    /// JSON Schema document for prompts
    fn output_schema() -> Value {
        serde_json::to_value(schemars::schema_for!(Self)).unwrap_or(Value::Null)
    }

    fn output_schema_pretty() -> String {
        serde_json::to_string_pretty(&Self::output_schema()).unwrap_or_default()
    }
}

/// Chat answer
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatAnswer {
    pub answer: String,
}

impl OutputSchema for ChatAnswer {
    fn check(&self) -> Result<(), String> {
        if self.answer.trim().is_empty() {
            return Err("answer is empty".to_string());
        }
        Ok(())
    }
}

/// Document summary
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SummaryOutput {
    /// Section headings with their key points, in document order
    #[serde(default)]
    pub outline: Vec<String>,
    pub summary: String,
}

impl OutputSchema for SummaryOutput {
    fn check(&self) -> Result<(), String> {
        if self.summary.trim().is_empty() {
            return Err("summary is empty".to_string());
        }
        Ok(())
    }
}

/// Explanation of a wrong answer
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExplanationOutput {
    pub explanation: String,
}

impl OutputSchema for ExplanationOutput {
    fn check(&self) -> Result<(), String> {
        if self.explanation.trim().is_empty() {
            return Err("explanation is empty".to_string());
        }
        Ok(())
    }
}

/// Generated question set
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuestionSet {
    pub questions: Vec<QuestionDraft>,
}

impl OutputSchema for QuestionSet {
    fn container_field() -> Option<&'static str> {
        Some("questions")
    }

    fn check(&self) -> Result<(), String> {
        if self.questions.is_empty() {
            return Err("questions list is empty".to_string());
        }
        for (i, q) in self.questions.iter().enumerate() {
            q.validate().map_err(|e| format!("questions[{}]: {}", i, e))?;
        }
        Ok(())
    }
}

/// Constraints pulled out of a free-form quiz request
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct QuizConstraints {
    /// Subject the questions should cover
    pub topic: String,
    #[serde(default)]
    pub question_count: Option<u32>,
    #[serde(default)]
    pub question_types: Option<Vec<QuestionType>>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl OutputSchema for QuizConstraints {
    fn check(&self) -> Result<(), String> {
        if self.topic.trim().is_empty() {
            return Err("topic is empty".to_string());
        }
        if self.question_count == Some(0) {
            return Err("question_count must be positive".to_string());
        }
        Ok(())
    }
}

/// Key entities named in a query
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EntityList {
    pub entities: Vec<String>,
}

impl OutputSchema for EntityList {
    fn container_field() -> Option<&'static str> {
        Some("entities")
    }
}

/// One extracted relation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TripleDraft {
    #[serde(alias = "subject")]
    pub source: String,
    pub relation: String,
    #[serde(alias = "object")]
    pub target: String,
}

/// Relations extracted from one chunk
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TripleSet {
    pub triples: Vec<TripleDraft>,
}

impl OutputSchema for TripleSet {
    fn container_field() -> Option<&'static str> {
        Some("triples")
    }
}

/// Append a schema, optional examples, and a fencing instruction to a prompt
pub fn prompt_with_schema<T: OutputSchema>(base_prompt: &str, examples: &[Value]) -> String {
    let mut prompt = format!(
        "{}\n\nReturn the result strictly following this JSON Schema:\n```json\n{}\n```",
        base_prompt,
        T::output_schema_pretty()
    );

    if !examples.is_empty() {
        let examples_json = serde_json::to_string_pretty(examples).unwrap_or_default();
        prompt.push_str(&format!(
            "\n\nExample output that meets the requirements:\n```json\n{}\n```",
            examples_json
        ));
    }

    prompt.push_str(
        "\n\nMake sure the output is valid JSON that can be parsed directly, with no extra \
         text or explanation. Wrap the output in ```json and ```.",
    );
    prompt
}
