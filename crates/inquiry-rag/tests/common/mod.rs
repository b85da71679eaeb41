//! Shared fakes for the pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use inquiry_rag::error::Result;
use inquiry_rag::providers::{
    CrossEncoder, HashEmbedder, LlmOutcome, LlmProvider, LlmRequest,
};
use inquiry_rag::storage::SqliteStore;
use inquiry_rag::{RagConfig, RagEngine, Services};

/// Answers by the first marker found in the prompt or system prompt
pub struct RoutingLlm {
    routes: Vec<(&'static str, String)>,
    fallback: String,
    calls: Mutex<Vec<LlmRequest>>,
}

impl RoutingLlm {
    pub fn new(routes: Vec<(&'static str, String)>, fallback: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            routes,
            fallback: fallback.into(),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Routes covering every call the engine makes on the sample document
    pub fn study_assistant() -> Arc<Self> {
        Self::study_assistant_with(Vec::new())
    }

    /// Like [`study_assistant`](Self::study_assistant), with `first` checked before
    /// the standard routes
    pub fn study_assistant_with(first: Vec<(&'static str, String)>) -> Arc<Self> {
        let mut routes = first;
        routes.extend([
            ("Extract the key entities", r#"{"entities": ["list", "Python"]}"#.to_string()),
            (
                "Extract the factual relations",
                r#"{"triples": [{"source": "list", "relation": "holds", "target": "mixed types"}]}"#
                    .to_string(),
            ),
            (
                "A learner asked for a quiz",
                r#"{"topic": "Python lists", "question_count": null, "question_types": null, "difficulty": null}"#
                    .to_string(),
            ),
            ("questions about", three_questions()),
            ("Summarize the document", r#"{"summary": "Lists are ordered, mutable collections [1]."}"#.to_string()),
            ("rewrite follow-up questions", "What methods does a Python list provide?".to_string()),
            ("Summarize the conversation", "The learner asked about Python lists.".to_string()),
            (
                "answered a quiz question incorrectly",
                r#"{"explanation": "Lists accept values of any type, so the answer is true [1]."}"#
                    .to_string(),
            ),
        ]);
        Self::new(
            routes,
            r#"{"answer": "A list is an ordered, mutable sequence [1]."}"#,
        )
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.calls.lock().iter().map(|r| r.prompt.clone()).collect()
    }
}

fn three_questions() -> String {
    serde_json::json!({
        "questions": [
            {
                "content": "Which Python type is mutable?",
                "question_type": "MC",
                "options": ["tuple", "list", "str"],
                "correct_answer": "B",
                "explanation": "Lists can change in place.",
                "knowledge_points": ["mutability"]
            },
            {
                "content": "A list can hold values of different types.",
                "question_type": "TF",
                "correct_answer": "yes",
                "explanation": "Lists are heterogeneous.",
                "knowledge_points": ["lists"]
            },
            {
                "content": "Which method appends one item?",
                "question_type": "MC",
                "options": ["append", "extend"],
                "correct_answer": "A",
                "explanation": "append adds a single element.",
                "knowledge_points": ["list methods"]
            }
        ]
    })
    .to_string()
}

#[async_trait]
impl LlmProvider for RoutingLlm {
    async fn generate(&self, request: &LlmRequest) -> LlmOutcome {
        self.calls.lock().push(request.clone());

        let system = request.system_prompt.as_deref().unwrap_or("");
        let text = self
            .routes
            .iter()
            .find(|(marker, _)| request.prompt.contains(marker) || system.contains(marker))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| self.fallback.clone());

        LlmOutcome::Completed {
            text,
            tokens_used: 10,
        }
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "routing"
    }

    fn model(&self) -> &str {
        "routing-test"
    }
}

/// Scores a passage by how many query words it contains
pub struct OverlapEncoder;

#[async_trait]
impl CrossEncoder for OverlapEncoder {
    async fn score(&self, query: &str, passages: &[String]) -> Result<Vec<f32>> {
        let words: Vec<String> = query
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|w| w.len() > 2)
            .collect();

        Ok(passages
            .iter()
            .map(|p| {
                let lower = p.to_lowercase();
                words.iter().filter(|w| lower.contains(w.as_str())).count() as f32
            })
            .collect())
    }

    fn name(&self) -> &str {
        "overlap"
    }
}

pub const SAMPLE_TITLE: &str = "Python Basics";

pub const SAMPLE_TEXT: &str = "Python is dynamically typed, so variables carry no declared type. \
A list in Python is an ordered, mutable collection. Lists hold mixed types and grow as items \
are appended. Tuples are ordered but immutable, which makes them usable as dictionary keys.";

pub struct TestEngine {
    pub engine: RagEngine,
    pub llm: Arc<RoutingLlm>,
    pub store: Arc<SqliteStore>,
    _dir: tempfile::TempDir,
}

pub fn engine_with(llm: Arc<RoutingLlm>) -> TestEngine {
    let dir = tempfile::tempdir().unwrap();

    let mut config = RagConfig::default();
    config.storage.database_path = dir.path().join("inquiry.db");
    config.storage.index_dir = dir.path().join("indices");
    config.chunking.chunk_size = 120;
    config.chunking.chunk_overlap = 20;

    let store = Arc::new(SqliteStore::in_memory().unwrap());
    let services = Services::new(
        llm.clone(),
        Arc::new(HashEmbedder::new(256)),
        Some(Arc::new(OverlapEncoder)),
    );

    let engine = RagEngine::new(config, store.clone(), store.clone(), services);

    TestEngine {
        engine,
        llm,
        store,
        _dir: dir,
    }
}
