//! Explanation pipeline: why a quiz answer was wrong

use serde_json::json;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::generation::prompt::render_explanation;
use crate::generation::strip_citation_markers;
use crate::structured::{prompt_with_schema, ExplanationOutput};
use crate::types::{ExplanationRequest, ExplanationResponse, SourceRef};

use super::{elapsed_ms, RagEngine};

impl RagEngine {
    /// Explain a wrong answer, grounded in the question's document when given
    pub async fn generate_explanation(&self, request: ExplanationRequest) -> ExplanationResponse {
        let start = Instant::now();
        let mut response = match self.run_explanation(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Explanation failed ({}): {}", e.kind(), e);
                ExplanationResponse::failed(&e)
            }
        };
        response.processing_time_ms = elapsed_ms(start);
        response
    }

    async fn run_explanation(&self, request: &ExplanationRequest) -> Result<ExplanationResponse> {
        let question = request.question.trim();
        let correct_answer = request.correct_answer.trim();
        if question.is_empty() || correct_answer.is_empty() {
            return Err(Error::precondition(
                "an explanation needs the question and its correct answer",
            ));
        }

        let retrieved = self
            .searcher
            .search(&format!("{} {}", question, correct_answer), request.document_id)
            .await?;
        let passages = retrieved.passages;

        let rendered = render_explanation(
            question,
            request.wrong_answer.trim(),
            correct_answer,
            &passages,
        );
        let prompt = prompt_with_schema::<ExplanationOutput>(
            &rendered.prompt,
            &[json!({
                "explanation": "Tuples cannot be changed after creation, so the statement is false."
            })],
        );
        let llm_request = self.llm_request(prompt, rendered.system);

        let structured = self
            .validator
            .generate::<ExplanationOutput>(&llm_request)
            .await?;

        let explanation = if passages.is_empty() {
            strip_citation_markers(&structured.value.explanation)
        } else {
            structured.value.explanation.trim().to_string()
        };

        Ok(ExplanationResponse {
            explanation,
            sources: passages.iter().map(SourceRef::from).collect(),
            tokens_used: retrieved.tokens_used + structured.tokens_used,
            ..Default::default()
        })
    }
}
