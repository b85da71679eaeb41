//! Quiz pipeline: constraints, retrieval, generation, atomic persistence

use serde_json::{json, Value};
use std::time::Instant;

use crate::config::QuizConfig;
use crate::error::{Error, Result};
use crate::generation::prompt::{render_quiz, render_quiz_constraints};
use crate::providers::LlmRequest;
use crate::structured::{prompt_with_schema, QuestionSet, QuizConstraints};
use crate::types::{Difficulty, QuestionType, Quiz, QuizRequest, QuizResponse, Role, Turn};

use super::{elapsed_ms, RagEngine};

/// Resolved quiz parameters
#[derive(Debug, Clone, PartialEq)]
pub struct QuizParameters {
    pub topic: String,
    pub question_count: u32,
    pub question_types: Vec<QuestionType>,
    pub difficulty: Difficulty,
}

/// Explicit request values win over extracted constraints, which win over
/// configured defaults; the count is clamped to `1..=max_question_count`
pub fn resolve_quiz_parameters(
    request: &QuizRequest,
    extracted: &QuizConstraints,
    defaults: &QuizConfig,
) -> QuizParameters {
    let topic = if extracted.topic.trim().is_empty() {
        request.user_query.trim().to_string()
    } else {
        extracted.topic.trim().to_string()
    };

    let question_count = request
        .question_count
        .or(extracted.question_count)
        .unwrap_or(defaults.default_question_count)
        .clamp(1, defaults.max_question_count.max(1));

    let mut question_types = request
        .question_types
        .clone()
        .filter(|t| !t.is_empty())
        .or_else(|| extracted.question_types.clone().filter(|t| !t.is_empty()))
        .unwrap_or_else(|| defaults.default_question_types.clone());
    let mut seen = Vec::new();
    question_types.retain(|t| {
        let fresh = !seen.contains(t);
        seen.push(*t);
        fresh
    });

    let difficulty = request
        .difficulty
        .or(extracted.difficulty)
        .unwrap_or(defaults.default_difficulty);

    QuizParameters {
        topic,
        question_count,
        question_types,
        difficulty,
    }
}

impl RagEngine {
    /// Generate and persist a quiz from a free-form request
    pub async fn generate_quiz(&self, request: QuizRequest) -> QuizResponse {
        let start = Instant::now();
        let mut response = match self.run_quiz(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Quiz generation failed ({}): {}", e.kind(), e);
                QuizResponse::failed(request.user_query.clone(), &e)
            }
        };
        response.processing_time_ms = elapsed_ms(start);
        response
    }

    /// Generate a quiz from what the learner last asked for in a conversation
    ///
    /// The latest user turn becomes the free-form request; explicit fields of
    /// `request` still take precedence over what is extracted from it.
    pub async fn generate_quiz_from_conversation(
        &self,
        history: &[Turn],
        mut request: QuizRequest,
    ) -> QuizResponse {
        let last_user = history.iter().rev().find(|turn| {
            turn.role == Role::User && !turn.is_summary && !turn.content.trim().is_empty()
        });

        match last_user {
            Some(turn) => {
                tracing::debug!("Quiz request taken from conversation: '{}'", turn.content);
                request.user_query = turn.content.clone();
                self.generate_quiz(request).await
            }
            None => {
                let e = Error::precondition("conversation has no user message to build a quiz from");
                tracing::warn!("Quiz generation failed ({}): {}", e.kind(), e);
                QuizResponse::failed(String::new(), &e)
            }
        }
    }

    async fn run_quiz(&self, request: &QuizRequest) -> Result<QuizResponse> {
        if request.user_query.trim().is_empty() {
            return Err(Error::precondition("quiz request is empty"));
        }

        let document = match request.document_id {
            Some(id) => Some(
                self.store
                    .get_document(id)?
                    .ok_or_else(|| Error::DocumentNotFound(id.to_string()))?,
            ),
            None => None,
        };

        let mut tokens_used = 0;
        let (constraints, constraint_tokens) = self.extract_constraints(request).await;
        tokens_used += constraint_tokens;

        let params = resolve_quiz_parameters(request, &constraints, &self.config.quiz);
        tracing::info!(
            "Generating {} {} question(s) on '{}' ({})",
            params.question_count,
            params
                .question_types
                .iter()
                .map(|t| t.code())
                .collect::<Vec<_>>()
                .join("/"),
            params.topic,
            params.difficulty.as_str()
        );

        let retrieved = self
            .searcher
            .search(&params.topic, request.document_id)
            .await?;
        tokens_used += retrieved.tokens_used;
        let passages = retrieved.passages;

        let rendered = render_quiz(
            &params.topic,
            &passages,
            params.question_count,
            &params.question_types,
            params.difficulty,
        );
        let prompt = prompt_with_schema::<QuestionSet>(
            &rendered.prompt,
            &[quiz_example(&params.question_types)],
        );
        let llm_request = self.llm_request(prompt, rendered.system);

        let wanted = params.question_count as usize;
        let allowed = params.question_types.clone();
        let structured = self
            .validator
            .generate_checked::<QuestionSet, _>(&llm_request, move |set: &QuestionSet| {
                if set.questions.len() < wanted {
                    return Err(format!(
                        "expected {} questions, got {}",
                        wanted,
                        set.questions.len()
                    ));
                }
                match set
                    .questions
                    .iter()
                    .find(|q| !allowed.contains(&q.question_type))
                {
                    Some(q) => Err(format!(
                        "question '{}' has type {}, allowed types are {}",
                        q.content,
                        q.question_type,
                        allowed
                            .iter()
                            .map(|t| t.code())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )),
                    None => Ok(()),
                }
            })
            .await?;
        tokens_used += structured.tokens_used;

        let mut drafts = structured.value.questions;
        if drafts.len() > wanted {
            tracing::debug!("Trimming {} generated questions to {}", drafts.len(), wanted);
            drafts.truncate(wanted);
        }

        let title = match &document {
            Some(doc) => format!("{} - {}", doc.title, params.topic),
            None => params.topic.clone(),
        };

        let quiz = Quiz::assemble(title, request.document_id, params.difficulty, drafts);
        self.store.save_quiz(&quiz)?;

        Ok(QuizResponse {
            quiz: Some(quiz),
            topic: params.topic,
            tokens_used,
            ..Default::default()
        })
    }

    /// Pull topic and explicit constraints out of the request text
    ///
    /// Any failure falls back to using the request text as the topic.
    async fn extract_constraints(&self, request: &QuizRequest) -> (QuizConstraints, u32) {
        let prompt = prompt_with_schema::<QuizConstraints>(
            &render_quiz_constraints(&request.user_query),
            &[json!({
                "topic": "Python list methods",
                "question_count": 5,
                "question_types": ["MC", "TF"],
                "difficulty": "easy"
            })],
        );
        let llm_request = LlmRequest::new(prompt).with_temperature(0.0);

        match self.validator.generate::<QuizConstraints>(&llm_request).await {
            Ok(out) => (out.value, out.tokens_used),
            Err(e) => {
                tracing::warn!(
                    "Quiz constraint extraction failed, using the request as topic: {}",
                    e
                );
                (
                    QuizConstraints {
                        topic: request.user_query.trim().to_string(),
                        ..Default::default()
                    },
                    0,
                )
            }
        }
    }
}

/// Example question set covering up to two of the requested types
fn quiz_example(types: &[QuestionType]) -> Value {
    let questions: Vec<Value> = types
        .iter()
        .take(2)
        .map(|t| match t {
            QuestionType::SingleChoice => json!({
                "content": "Which built-in Python type is mutable?",
                "question_type": "MC",
                "options": [{"id": "A", "text": "tuple"}, {"id": "B", "text": "list"}, {"id": "C", "text": "str"}],
                "correct_answer": "B",
                "explanation": "Lists can be modified in place.",
                "knowledge_points": ["mutability"]
            }),
            QuestionType::MultipleChoice => json!({
                "content": "Which of these are sequence types?",
                "question_type": "MCM",
                "options": [{"id": "A", "text": "list"}, {"id": "B", "text": "tuple"}, {"id": "C", "text": "set"}],
                "correct_answer": ["A", "B"],
                "explanation": "Sets are unordered.",
                "knowledge_points": ["sequences"]
            }),
            QuestionType::TrueFalse => json!({
                "content": "A Python list can hold values of different types.",
                "question_type": "TF",
                "correct_answer": "true",
                "explanation": "Lists are heterogeneous.",
                "knowledge_points": ["lists"]
            }),
            QuestionType::FillBlank => json!({
                "content": "The method that adds one item to the end of a list is ____.",
                "question_type": "FB",
                "correct_answer": "append",
                "explanation": "list.append adds a single element.",
                "knowledge_points": ["list methods"]
            }),
            QuestionType::ShortAnswer => json!({
                "content": "Explain the difference between a list and a tuple.",
                "question_type": "SA",
                "correct_answer": "Lists are mutable; tuples are immutable.",
                "explanation": "Mutability is the key difference.",
                "knowledge_points": ["mutability"]
            }),
        })
        .collect();

    json!({ "questions": questions })
}
