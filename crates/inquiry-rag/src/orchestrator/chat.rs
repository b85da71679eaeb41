//! Chat pipeline: rewrite, retrieve, prompt, generate, validate

use serde_json::json;
use std::time::Instant;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::generation::prompt::render_chat;
use crate::generation::strip_citation_markers;
use crate::structured::{prompt_with_schema, ChatAnswer};
use crate::types::{ChatRequest, ChatResponse, SourceRef, Turn};

use super::{elapsed_ms, RagEngine};

impl RagEngine {
    /// Answer a question, optionally grounded in one document
    pub async fn chat(&self, request: ChatRequest) -> ChatResponse {
        let start = Instant::now();
        let mut response = match self.run_chat(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Chat failed ({}): {}", e.kind(), e);
                ChatResponse::failed(request.query.clone(), &e)
            }
        };
        response.processing_time_ms = elapsed_ms(start);

        tracing::info!(
            "Chat answered in {}ms ({} sources, {} tokens)",
            response.processing_time_ms,
            response.sources.len(),
            response.tokens_used
        );
        response
    }

    /// Chat within a stored conversation, appending both turns on success
    pub async fn chat_in_conversation(
        &self,
        conversation_id: Uuid,
        query: &str,
        document_id: Option<Uuid>,
    ) -> ChatResponse {
        let history = match self.store.get_turns(conversation_id) {
            Ok(history) => history,
            Err(e) => return ChatResponse::failed(query, &e),
        };

        let mut request = ChatRequest::new(query).with_history(history);
        request.document_id = document_id;

        let response = self.chat(request).await;
        if response.is_error() {
            return response;
        }

        let mut user = Turn::user(query);
        user.document_id = document_id;
        let mut assistant = Turn::assistant(response.answer.clone());
        assistant.document_id = document_id;

        let saved = self
            .store
            .append_turn(conversation_id, &user)
            .and_then(|_| self.store.append_turn(conversation_id, &assistant));

        match saved {
            Ok(()) => response,
            Err(e) => ChatResponse::failed(query, &e),
        }
    }

    async fn run_chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(Error::precondition("query is empty"));
        }

        let history = self.compressor.compress(&request.history).await;
        let rewrite = self.rewriter.rewrite(query, &history.turns).await;

        let retrieved = self
            .searcher
            .search(&rewrite.query, request.document_id)
            .await?;
        let passages = retrieved.passages;
        let is_generic = passages.is_empty();
        if is_generic {
            tracing::info!("No passages for '{}', answering from model knowledge", rewrite.query);
        }

        let rendered = render_chat(query, &passages, &history.turns);
        let prompt = prompt_with_schema::<ChatAnswer>(
            &rendered.prompt,
            &[json!({"answer": "A list is an ordered, mutable collection of items."})],
        );
        let llm_request = self.llm_request(prompt, rendered.system);

        let structured = self.validator.generate::<ChatAnswer>(&llm_request).await?;

        let answer = if is_generic {
            strip_citation_markers(&structured.value.answer)
        } else {
            structured.value.answer.trim().to_string()
        };

        Ok(ChatResponse {
            answer,
            sources: passages.iter().map(SourceRef::from).collect(),
            is_generic_answer: is_generic,
            original_query: request.query.clone(),
            rewritten_query: rewrite.rewritten.then(|| rewrite.query.clone()),
            tokens_used: history.tokens_used
                + rewrite.tokens_used
                + retrieved.tokens_used
                + structured.tokens_used,
            ..Default::default()
        })
    }
}
