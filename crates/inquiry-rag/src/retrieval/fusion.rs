//! Retrieval fusion: merge, deduplicate, rerank, boost, truncate
//!
//! Each source's scores are min-max normalized into `[0, 1]` before merging,
//! so no source dominates purely through scale. A cross-encoder then scores
//! every surviving candidate against the query. Without a usable
//! cross-encoder the merged list keeps its normalized scores.

use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::RetrievalConfig;
use crate::providers::CrossEncoder;
use crate::types::{Chunk, RetrievalSource, RetrievedPassage};

use super::lexical::ScoredChunk;

/// One retriever's candidates, with scores where higher is better
#[derive(Debug, Clone)]
pub struct SourceCandidates {
    pub source: RetrievalSource,
    pub hits: Vec<(Chunk, f32)>,
}

impl SourceCandidates {
    pub fn new(source: RetrievalSource, hits: Vec<(Chunk, f32)>) -> Self {
        Self { source, hits }
    }

    /// BM25 hits keep their raw scores
    pub fn lexical(hits: Vec<ScoredChunk<'_>>) -> Self {
        Self::new(
            RetrievalSource::Lexical,
            hits.into_iter().map(|h| (h.chunk.clone(), h.score)).collect(),
        )
    }

    /// Dense hits arrive as distances; similarity is `1 - distance`
    pub fn dense(hits: Vec<(Chunk, f32)>) -> Self {
        Self::new(
            RetrievalSource::Dense,
            hits.into_iter().map(|(c, d)| (c, 1.0 - d)).collect(),
        )
    }

    /// Graph hits carry no score; earlier hits rank higher
    pub fn graph(chunks: Vec<Chunk>) -> Self {
        let n = chunks.len() as f32;
        Self::new(
            RetrievalSource::Graph,
            chunks
                .into_iter()
                .enumerate()
                .map(|(i, c)| (c, (n - i as f32) / n))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Min-max normalize into `[0, 1]`; a list of equal scores maps to 1.0
pub fn normalize_scores(scores: &mut [f32]) {
    let (min, max) = scores
        .iter()
        .filter(|s| s.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| {
            (lo.min(s), hi.max(s))
        });

    let range = max - min;
    for score in scores.iter_mut() {
        *score = if !score.is_finite() {
            0.0
        } else if range <= f32::EPSILON {
            1.0
        } else {
            (*score - min) / range
        };
    }
}

/// Merge candidate lists, keeping one entry per chunk with the union of its
/// sources and its best normalized score; first-seen order is kept
pub fn merge_candidates(lists: Vec<SourceCandidates>) -> Vec<RetrievedPassage> {
    let mut merged: Vec<RetrievedPassage> = Vec::new();
    let mut positions: HashMap<Uuid, usize> = HashMap::new();

    for list in lists {
        let source = list.source;
        let (chunks, mut scores): (Vec<Chunk>, Vec<f32>) = list.hits.into_iter().unzip();
        normalize_scores(&mut scores);

        for (chunk, score) in chunks.into_iter().zip(scores) {
            match positions.get(&chunk.id) {
                Some(&i) => {
                    let existing = &mut merged[i];
                    existing.sources.insert(source);
                    existing.score = existing.score.max(score);
                }
                None => {
                    positions.insert(chunk.id, merged.len());
                    merged.push(RetrievedPassage::new(chunk, source, score));
                }
            }
        }
    }

    merged
}

/// Sort by non-increasing score (stable) and keep the first `k`
pub fn rank_and_truncate(passages: &mut Vec<RetrievedPassage>, k: usize) {
    passages.sort_by(|a, b| b.score.total_cmp(&a.score));
    passages.truncate(k);
}

/// Fuses candidates from all retrieval sources into a final passage list
pub struct FusionEngine {
    reranker: Option<Arc<dyn CrossEncoder>>,
    final_k: usize,
    authoritative_boost: f32,
    authoritative_sources: Vec<RetrievalSource>,
}

impl FusionEngine {
    pub fn new(config: &RetrievalConfig, reranker: Option<Arc<dyn CrossEncoder>>) -> Self {
        Self {
            reranker,
            final_k: config.final_k,
            authoritative_boost: config.authoritative_boost,
            authoritative_sources: config.authoritative_sources.clone(),
        }
    }

    pub fn final_k(&self) -> usize {
        self.final_k
    }

    /// Fuse candidate lists for a query
    ///
    /// `document_in_scope` enables the boost for authoritative sources.
    /// Zero candidates is a valid result, not an error.
    pub async fn fuse(
        &self,
        query: &str,
        lists: Vec<SourceCandidates>,
        document_in_scope: bool,
    ) -> Vec<RetrievedPassage> {
        let counts: Vec<String> = lists
            .iter()
            .map(|l| format!("{}={}", l.source, l.hits.len()))
            .collect();

        let mut passages = merge_candidates(lists);
        if passages.is_empty() {
            tracing::info!("Fusion: no candidates from any source");
            return passages;
        }

        tracing::debug!(
            "Fusion: {} unique candidates ({})",
            passages.len(),
            counts.join(", ")
        );

        match self.rerank_scores(query, &passages).await {
            Some(scores) => {
                for (passage, score) in passages.iter_mut().zip(scores) {
                    passage.score = if score.is_finite() { score } else { 0.0 };
                }
            }
            None => {
                tracing::warn!(
                    "Reranking skipped, keeping normalized retrieval scores for {} candidates",
                    passages.len()
                );
            }
        }

        if document_in_scope && self.authoritative_boost != 0.0 {
            let factor = 1.0 + self.authoritative_boost;
            for passage in passages.iter_mut() {
                if passage.has_any_source(&self.authoritative_sources) {
                    passage.score *= factor;
                }
            }
        }

        rank_and_truncate(&mut passages, self.final_k);
        passages
    }

    async fn rerank_scores(&self, query: &str, passages: &[RetrievedPassage]) -> Option<Vec<f32>> {
        let reranker = self.reranker.as_ref()?;
        if !reranker.is_available() {
            tracing::warn!("Cross-encoder {} is not available", reranker.name());
            return None;
        }

        let texts: Vec<String> = passages.iter().map(|p| p.chunk.text.clone()).collect();
        match reranker.score(query, &texts).await {
            Ok(scores) if scores.len() == texts.len() => Some(scores),
            Ok(scores) => {
                tracing::warn!(
                    "Cross-encoder {} returned {} scores for {} passages",
                    reranker.name(),
                    scores.len(),
                    texts.len()
                );
                None
            }
            Err(e) => {
                tracing::warn!("Cross-encoder {} failed: {}", reranker.name(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use proptest::prelude::*;

    struct KeywordEncoder(&'static str);

    #[async_trait]
    impl CrossEncoder for KeywordEncoder {
        async fn score(&self, _query: &str, passages: &[String]) -> Result<Vec<f32>> {
            Ok(passages
                .iter()
                .map(|p| if p.to_lowercase().contains(self.0) { 0.9 } else { 0.1 })
                .collect())
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    struct DownEncoder;

    #[async_trait]
    impl CrossEncoder for DownEncoder {
        async fn score(&self, _query: &str, _passages: &[String]) -> Result<Vec<f32>> {
            Err(Error::unavailable("connection refused"))
        }

        fn name(&self) -> &str {
            "down"
        }
    }

    fn config(final_k: usize) -> RetrievalConfig {
        RetrievalConfig {
            final_k,
            ..Default::default()
        }
    }

    fn chunk(doc: Uuid, ordinal: u32, text: &str) -> Chunk {
        Chunk::new(doc, ordinal, text)
    }

    #[test]
    fn test_normalize_scores() {
        let mut scores = vec![2.0, 4.0, 3.0];
        normalize_scores(&mut scores);
        assert_eq!(scores, vec![0.0, 1.0, 0.5]);

        let mut equal = vec![0.7, 0.7];
        normalize_scores(&mut equal);
        assert_eq!(equal, vec![1.0, 1.0]);
    }

    #[test]
    fn test_merge_unions_sources() {
        let doc = Uuid::new_v4();
        let a = chunk(doc, 0, "a");
        let b = chunk(doc, 1, "b");

        let merged = merge_candidates(vec![
            SourceCandidates::new(RetrievalSource::Lexical, vec![(a.clone(), 3.0), (b.clone(), 1.0)]),
            SourceCandidates::dense(vec![(b.clone(), 0.2)]),
            SourceCandidates::graph(vec![a.clone()]),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].chunk.id, a.id);
        assert!(merged[0].sources.contains(&RetrievalSource::Lexical));
        assert!(merged[0].sources.contains(&RetrievalSource::Graph));
        assert_eq!(merged[1].sources.len(), 2);
        assert_eq!(merged[1].score, 1.0);
    }

    #[tokio::test]
    async fn test_reranker_decides_order() {
        let doc = Uuid::new_v4();
        let typing = chunk(doc, 0, "Python is dynamically typed.");
        let lists = chunk(doc, 1, "Lists hold mixed types.");

        let engine = FusionEngine::new(&config(5), Some(Arc::new(KeywordEncoder("list"))));
        let out = engine
            .fuse(
                "What is a list in Python?",
                vec![SourceCandidates::new(
                    RetrievalSource::Lexical,
                    vec![(typing, 5.0), (lists.clone(), 1.0)],
                )],
                false,
            )
            .await;

        assert_eq!(out[0].chunk.id, lists.id);
    }

    #[tokio::test]
    async fn test_failed_reranker_keeps_retrieval_order() {
        let doc = Uuid::new_v4();
        let first = chunk(doc, 0, "first");
        let second = chunk(doc, 1, "second");

        let engine = FusionEngine::new(&config(5), Some(Arc::new(DownEncoder)));
        let out = engine
            .fuse(
                "q",
                vec![SourceCandidates::new(
                    RetrievalSource::Lexical,
                    vec![(first.clone(), 2.0), (second, 1.0)],
                )],
                false,
            )
            .await;

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].chunk.id, first.id);
    }

    #[tokio::test]
    async fn test_authoritative_boost_breaks_ties() {
        let doc = Uuid::new_v4();
        let lexical_only = chunk(doc, 0, "same");
        let dense_only = chunk(doc, 1, "same");

        let engine = FusionEngine::new(&config(5), Some(Arc::new(KeywordEncoder("same"))));
        let lists = || {
            vec![
                SourceCandidates::new(RetrievalSource::Lexical, vec![(lexical_only.clone(), 1.0)]),
                SourceCandidates::dense(vec![(dense_only.clone(), 0.1)]),
            ]
        };

        let boosted = engine.fuse("q", lists(), true).await;
        assert_eq!(boosted[0].chunk.id, dense_only.id);
        assert!((boosted[0].score - 0.9 * 1.05).abs() < 1e-5);

        let plain = engine.fuse("q", lists(), false).await;
        assert_eq!(plain[0].chunk.id, lexical_only.id);
    }

    #[tokio::test]
    async fn test_no_candidates_is_empty() {
        let engine = FusionEngine::new(&config(5), None);
        let out = engine
            .fuse(
                "q",
                vec![
                    SourceCandidates::new(RetrievalSource::Lexical, Vec::new()),
                    SourceCandidates::dense(Vec::new()),
                    SourceCandidates::graph(Vec::new()),
                ],
                true,
            )
            .await;
        assert!(out.is_empty());
    }

    proptest! {
        #[test]
        fn prop_rank_caps_and_sorts(
            scores in proptest::collection::vec(-10.0f32..10.0, 0..40),
            k in 1usize..10,
        ) {
            let doc = Uuid::new_v4();
            let hits = scores
                .iter()
                .enumerate()
                .map(|(i, s)| (chunk(doc, i as u32, "t"), *s))
                .collect();
            let mut passages = merge_candidates(vec![SourceCandidates::new(
                RetrievalSource::Lexical,
                hits,
            )]);
            rank_and_truncate(&mut passages, k);

            prop_assert!(passages.len() <= k);
            for pair in passages.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }
    }
}
