//! Entity-based retrieval over the knowledge graph

use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::providers::llm::LlmRequest;
use crate::providers::GraphStore;
use crate::structured::{prompt_with_schema, EntityList, StructuredOutputValidator};

const MAX_ENTITIES: usize = 8;

const ENTITY_PROMPT: &str = "Extract the key entities (concepts, names, technical terms) \
from the question below. Return at most 8 short noun phrases, most important first.\n\n\
Question: ";

/// Chunk ids from a graph lookup and the model tokens spent finding them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphHits {
    pub chunk_ids: Vec<Uuid>,
    pub tokens_used: u32,
}

/// Finds chunks whose triples mention entities named in a query
pub struct GraphRetriever {
    store: Arc<dyn GraphStore>,
    validator: Option<Arc<StructuredOutputValidator>>,
}

impl GraphRetriever {
    /// Create a retriever; without a validator, entities come from keyword splitting
    pub fn new(store: Arc<dyn GraphStore>, validator: Option<Arc<StructuredOutputValidator>>) -> Self {
        Self { store, validator }
    }

    /// Chunk ids in graph insertion order, at most `limit`
    pub async fn search(
        &self,
        query: &str,
        document_id: Option<Uuid>,
        limit: usize,
    ) -> Result<GraphHits> {
        let (entities, tokens_used) = self.extract_entities(query).await;
        if entities.is_empty() {
            return Ok(GraphHits {
                chunk_ids: Vec::new(),
                tokens_used,
            });
        }

        tracing::debug!("Graph lookup for entities {:?}", entities);
        let chunk_ids = self
            .store
            .query_by_entities(&entities, document_id, limit)
            .await?;
        Ok(GraphHits {
            chunk_ids,
            tokens_used,
        })
    }

    /// Ask the model for entities, with the tokens the call cost
    ///
    /// An empty answer means the query itself is the entity. Keyword
    /// splitting is used only when there is no model or the call fails.
    pub async fn extract_entities(&self, query: &str) -> (Vec<String>, u32) {
        let Some(validator) = &self.validator else {
            return (keyword_entities(query), 0);
        };

        let prompt = prompt_with_schema::<EntityList>(&format!("{}{}", ENTITY_PROMPT, query), &[]);
        let request = LlmRequest::new(prompt).with_temperature(0.0);

        match validator.generate::<EntityList>(&request).await {
            Ok(out) => {
                let entities = clean_entities(out.value.entities);
                if entities.is_empty() {
                    return (clean_entities(vec![query.to_string()]), out.tokens_used);
                }
                (entities, out.tokens_used)
            }
            Err(e) => {
                tracing::warn!("Entity extraction failed, using keywords: {}", e);
                (keyword_entities(query), 0)
            }
        }
    }
}

fn clean_entities(raw: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for entity in raw {
        let entity = entity.trim().to_string();
        if entity.is_empty() || out.iter().any(|e| e.eq_ignore_ascii_case(&entity)) {
            continue;
        }
        out.push(entity);
        if out.len() >= MAX_ENTITIES {
            break;
        }
    }
    out
}

/// Deterministic fallback: whitespace-split terms longer than one character
pub fn keyword_entities(query: &str) -> Vec<String> {
    let terms = query
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|t| t.chars().count() > 1)
        .collect();
    clean_entities(terms)
}
