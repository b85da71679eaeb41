//! Summary pipeline

use serde_json::json;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::generation::prompt::render_summary;
use crate::generation::strip_citation_markers;
use crate::structured::{prompt_with_schema, SummaryOutput};
use crate::types::{SummaryRequest, SummaryResponse};

use super::{elapsed_ms, RagEngine};

impl RagEngine {
    /// Summarize one document; a missing `document_id` fails before any model call
    pub async fn summarize(&self, request: SummaryRequest) -> SummaryResponse {
        let start = Instant::now();
        let mut response = match self.run_summary(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Summary failed ({}): {}", e.kind(), e);
                SummaryResponse::failed(request.document_id, &e)
            }
        };
        response.processing_time_ms = elapsed_ms(start);
        response
    }

    async fn run_summary(&self, request: &SummaryRequest) -> Result<SummaryResponse> {
        let document_id = request
            .document_id
            .ok_or_else(|| Error::precondition("a document is required for summarization"))?;

        let document = self
            .store
            .get_document(document_id)?
            .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))?;

        let content = truncate_chars(document.content.trim(), self.config.summary.max_input_chars);
        if content.is_empty() {
            return Err(Error::precondition(format!(
                "document {} has no content",
                document_id
            )));
        }
        if content.len() < document.content.trim().len() {
            tracing::info!(
                "Summarizing the first {} characters of document {}",
                self.config.summary.max_input_chars,
                document_id
            );
        }

        let length = request.length.unwrap_or(self.config.summary.default_length);
        let include_outline = request
            .include_outline
            .unwrap_or(self.config.summary.include_outline);

        let rendered = render_summary(&document.title, content, length, include_outline);
        let example = if include_outline {
            json!({
                "outline": ["1. Built-in collections: lists, tuples, dictionaries"],
                "summary": "The document introduces Python's built-in collection types..."
            })
        } else {
            json!({"summary": "The document introduces Python's built-in collection types..."})
        };
        let prompt = prompt_with_schema::<SummaryOutput>(&rendered.prompt, &[example]);
        let llm_request = self.llm_request(prompt, rendered.system);

        let structured = self
            .validator
            .generate_checked::<SummaryOutput, _>(&llm_request, move |out: &SummaryOutput| {
                if include_outline && out.outline.iter().all(|e| e.trim().is_empty()) {
                    return Err("an outline was requested but none was given".to_string());
                }
                Ok(())
            })
            .await?;

        let outline = if include_outline {
            structured
                .value
                .outline
                .iter()
                .map(|e| strip_citation_markers(e))
                .filter(|e| !e.trim().is_empty())
                .collect()
        } else {
            Vec::new()
        };

        tracing::debug!(
            "Summary for {} ({}, outline: {})",
            document_id,
            length.as_str(),
            include_outline
        );

        Ok(SummaryResponse {
            summary: strip_citation_markers(&structured.value.summary),
            outline,
            document_id: Some(document_id),
            length,
            tokens_used: structured.tokens_used,
            ..Default::default()
        })
    }
}

/// First `max_chars` characters of `text`, cut on a char boundary
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello", 2), "he");
        assert_eq!(truncate_chars("列表元组", 3), "列表元");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
