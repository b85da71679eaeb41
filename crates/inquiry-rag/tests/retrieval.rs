//! Fusion, history, and repair behavior through the public API

mod common;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use common::{OverlapEncoder, RoutingLlm};
use inquiry_rag::config::{HistoryConfig, RetrievalConfig};
use inquiry_rag::error::Result;
use inquiry_rag::history::{HistoryCompressor, QueryRewriter};
use inquiry_rag::providers::{CrossEncoder, LlmRequest};
use inquiry_rag::retrieval::{Bm25Index, FusionEngine, SourceCandidates};
use inquiry_rag::structured::{ChatAnswer, StructuredOutputValidator};
use inquiry_rag::types::RetrievalSource;
use inquiry_rag::{Chunk, Turn};

fn python_chunks() -> Vec<Chunk> {
    let doc = Uuid::new_v4();
    vec![
        Chunk::new(doc, 0, "Python is dynamically typed."),
        Chunk::new(doc, 1, "Lists hold mixed types."),
    ]
}

/// Fixed relevance per passage text
struct TableEncoder(Vec<(&'static str, f32)>);

#[async_trait]
impl CrossEncoder for TableEncoder {
    async fn score(&self, _query: &str, passages: &[String]) -> Result<Vec<f32>> {
        Ok(passages
            .iter()
            .map(|p| {
                self.0
                    .iter()
                    .find(|(text, _)| p.as_str() == *text)
                    .map_or(0.0, |(_, score)| *score)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "table"
    }
}

#[tokio::test]
async fn test_list_passage_ranks_first() {
    let chunks = python_chunks();
    let encoder = TableEncoder(vec![
        ("Python is dynamically typed.", 0.12),
        ("Lists hold mixed types.", 0.87),
    ]);
    let engine = FusionEngine::new(&RetrievalConfig::default(), Some(Arc::new(encoder)));

    // Both retrievers put the typing sentence first
    let lists = vec![
        SourceCandidates::new(
            RetrievalSource::Lexical,
            vec![(chunks[0].clone(), 2.0), (chunks[1].clone(), 1.0)],
        ),
        SourceCandidates::dense(vec![(chunks[0].clone(), 0.2), (chunks[1].clone(), 0.3)]),
    ];

    let fused = engine.fuse("What is a list in Python?", lists, true).await;

    assert_eq!(fused.len(), 2);
    assert_eq!(fused[0].chunk.text, "Lists hold mixed types.");
    assert!(fused[0].score > fused[1].score);
}

#[tokio::test]
async fn test_bm25_feeds_fusion() {
    let index = Bm25Index::build(python_chunks());
    let engine = FusionEngine::new(&RetrievalConfig::default(), None);

    let hits = index.search("mixed types", 10);
    assert_eq!(hits[0].chunk.ordinal, 1);

    let fused = engine
        .fuse("mixed types", vec![SourceCandidates::lexical(hits)], false)
        .await;
    assert_eq!(fused[0].chunk.ordinal, 1);
    assert!(fused[0].sources.contains(&RetrievalSource::Lexical));
}

#[tokio::test]
async fn test_no_candidates_is_empty_not_error() {
    let engine = FusionEngine::new(&RetrievalConfig::default(), Some(Arc::new(OverlapEncoder)));

    let fused = engine
        .fuse(
            "anything",
            vec![
                SourceCandidates::lexical(Vec::new()),
                SourceCandidates::dense(Vec::new()),
                SourceCandidates::graph(Vec::new()),
            ],
            true,
        )
        .await;

    assert!(fused.is_empty());
}

#[tokio::test]
async fn test_short_history_is_untouched() {
    let llm = RoutingLlm::study_assistant();
    let compressor =
        HistoryCompressor::new(llm.clone(), Duration::from_secs(5), &HistoryConfig::default());

    let history = vec![
        Turn::user("What is a list?"),
        Turn::assistant("An ordered collection."),
        Turn::user("And a tuple?"),
    ];
    let compressed = compressor.compress(&history).await;

    assert_eq!(compressed.turns, history);
    assert!(!compressed.summarized);
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_long_history_is_bounded() {
    let llm = RoutingLlm::study_assistant();
    let config = HistoryConfig::default();
    let compressor = HistoryCompressor::new(llm.clone(), Duration::from_secs(5), &config);

    let history: Vec<Turn> = (0..20)
        .map(|i| Turn::user(format!("{} {}", "a fairly long message about lists".repeat(5), i)))
        .collect();
    let compressed = compressor.compress(&history).await;

    assert!(compressed.turns.len() <= config.recency_threshold + 1);
    assert!(compressed.summarized);
    assert!(compressed.turns[0].is_summary);
    assert_eq!(compressed.turns[0].content, "The learner asked about Python lists.");
    assert_eq!(compressed.turns.last(), history.last());
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_small_older_history_is_folded_without_a_call() {
    let llm = RoutingLlm::study_assistant();
    let config = HistoryConfig::default();
    let compressor = HistoryCompressor::new(llm.clone(), Duration::from_secs(5), &config);

    let history: Vec<Turn> = (0..8).map(|i| Turn::user(format!("q{}", i))).collect();
    let compressed = compressor.compress(&history).await;

    assert_eq!(compressed.turns.len(), config.recency_threshold + 1);
    assert!(compressed.turns[0].is_summary);
    assert!(compressed.turns[0].content.contains("q0"));
    assert!(!compressed.summarized);
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_rewrite_needs_history() {
    let llm = RoutingLlm::study_assistant();
    let rewriter = QueryRewriter::new(llm.clone(), Duration::from_secs(5), 0.5);

    let unchanged = rewriter.rewrite("What is a list?", &[]).await;
    assert_eq!(unchanged.query, "What is a list?");
    assert!(!unchanged.rewritten);
    assert_eq!(llm.call_count(), 0);

    let history = vec![Turn::user("What is a list?"), Turn::assistant("A sequence.")];
    let rewritten = rewriter.rewrite("What methods?", &history).await;
    assert!(rewritten.rewritten);
    assert_eq!(rewritten.query, "What methods does a Python list provide?");
}

#[tokio::test]
async fn test_truncated_rewrite_is_rejected() {
    let llm = RoutingLlm::new(vec![], "list?");
    let rewriter = QueryRewriter::new(llm, Duration::from_secs(5), 0.5);

    let history = vec![Turn::user("Tell me about lists"), Turn::assistant("Sure.")];
    let out = rewriter
        .rewrite("What are the common methods of it?", &history)
        .await;

    assert!(!out.rewritten);
    assert_eq!(out.query, "What are the common methods of it?");
}

#[tokio::test]
async fn test_repair_is_idempotent_on_valid_output() {
    let llm = RoutingLlm::new(vec![], r#"{"answer": "unused"}"#);
    let validator = StructuredOutputValidator::new(llm.clone(), 2, Duration::from_secs(5));
    let request = LlmRequest::new("What is a list?");

    let raw = r#"{"answer": "An ordered, mutable sequence."}"#.to_string();
    let first = validator
        .validate_or_repair::<ChatAnswer, _>(raw.clone(), &request, |_: &ChatAnswer| Ok(()))
        .await
        .unwrap();
    let second = validator
        .validate_or_repair::<ChatAnswer, _>(raw, &request, |_: &ChatAnswer| Ok(()))
        .await
        .unwrap();

    assert_eq!(first.value.answer, second.value.answer);
    assert_eq!(first.repair_calls, 0);
    assert_eq!(second.repair_calls, 0);
    assert_eq!(llm.call_count(), 0);
    assert_eq!(validator.repair_calls_total(), 0);
}
