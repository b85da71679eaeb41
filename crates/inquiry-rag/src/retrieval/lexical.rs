//! BM25 lexical retrieval over a fixed chunk corpus
//!
//! The index is built once from a snapshot of chunks and never updated in
//! place; reprocessing a document builds a new one.

use std::collections::HashMap;

use crate::types::Chunk;

use super::tokenize::tokenize;

const K1: f32 = 1.2;
const B: f32 = 0.75;

/// A chunk with its lexical score
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub score: f32,
}

/// Term-frequency index over one corpus snapshot
#[derive(Debug, Clone, Default)]
pub struct Bm25Index {
    /// Chunks in ordinal order
    chunks: Vec<Chunk>,
    /// Per-chunk term frequencies
    term_freqs: Vec<HashMap<String, u32>>,
    /// Per-chunk token counts
    lengths: Vec<usize>,
    /// Number of chunks containing each term
    doc_freq: HashMap<String, usize>,
    avg_len: f32,
}

impl Bm25Index {
    /// Build from a chunk snapshot
    pub fn build(mut chunks: Vec<Chunk>) -> Self {
        chunks.sort_by_key(|c| c.ordinal);

        let mut term_freqs = Vec::with_capacity(chunks.len());
        let mut lengths = Vec::with_capacity(chunks.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for chunk in &chunks {
            let tokens = tokenize(&chunk.text);
            lengths.push(tokens.len());

            let mut tf: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *tf.entry(token).or_insert(0) += 1;
            }
            for term in tf.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(tf);
        }

        let total: usize = lengths.iter().sum();
        let avg_len = if chunks.is_empty() {
            1.0
        } else {
            (total as f32 / chunks.len() as f32).max(1.0)
        };

        Self {
            chunks,
            term_freqs,
            lengths,
            doc_freq,
            avg_len,
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.chunks.len() as f32;
        let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// Top `k` chunks by BM25, highest first; ties go to the earlier ordinal
    ///
    /// Chunks sharing no term with the query are not returned.
    pub fn search(&self, query: &str, k: usize) -> Vec<ScoredChunk<'_>> {
        let mut terms = tokenize(query);
        terms.sort();
        terms.dedup();

        if terms.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<ScoredChunk<'_>> = self
            .chunks
            .iter()
            .enumerate()
            .filter_map(|(i, chunk)| {
                let tf = &self.term_freqs[i];
                let len_norm = 1.0 - B + B * self.lengths[i] as f32 / self.avg_len;

                let score: f32 = terms
                    .iter()
                    .filter_map(|term| tf.get(term).map(|f| (term, *f as f32)))
                    .map(|(term, f)| self.idf(term) * f * (K1 + 1.0) / (f + K1 * len_norm))
                    .sum();

                (score > 0.0).then_some(ScoredChunk { chunk, score })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.chunk.ordinal.cmp(&b.chunk.ordinal))
        });
        scored.truncate(k);
        scored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn corpus(texts: &[&str]) -> Vec<Chunk> {
        let doc = Uuid::new_v4();
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk::new(doc, i as u32, *t))
            .collect()
    }

    #[test]
    fn test_ranks_matching_chunk_first() {
        let index = Bm25Index::build(corpus(&[
            "Tuples are immutable sequences.",
            "Lists hold mixed types and can grow.",
            "Dictionaries map keys to values.",
        ]));

        let hits = index.search("what can lists hold", 3);
        assert_eq!(hits[0].chunk.ordinal, 1);
        assert!(hits.iter().all(|h| h.score > 0.0));
    }

    #[test]
    fn test_ties_broken_by_ordinal() {
        let index = Bm25Index::build(corpus(&[
            "alpha beta",
            "gamma delta",
            "alpha beta",
        ]));

        let hits = index.search("alpha", 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].chunk.ordinal, 0);
        assert_eq!(hits[1].chunk.ordinal, 2);
        assert_eq!(hits[0].score, hits[1].score);
    }

    #[test]
    fn test_no_overlap_returns_nothing() {
        let index = Bm25Index::build(corpus(&["Tuples are immutable."]));
        assert!(index.search("dictionary", 5).is_empty());
        assert!(index.search("", 5).is_empty());
    }

    #[test]
    fn test_cjk_query_matches() {
        let index = Bm25Index::build(corpus(&["元组是不可变的。", "列表可以存放不同类型。"]));
        let hits = index.search("列表", 2);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.ordinal, 1);
    }

    #[test]
    fn test_k_caps_results() {
        let index = Bm25Index::build(corpus(&["x y", "x z", "x w"]));
        assert_eq!(index.search("x", 2).len(), 2);
    }
}
