//! Request-scoped retrieval results

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::document::Chunk;

/// Which retriever produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalSource {
    /// BM25 term matching
    Lexical,
    /// Embedding nearest-neighbor search
    Dense,
    /// Knowledge-graph entity lookup
    Graph,
}

impl RetrievalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalSource::Lexical => "lexical",
            RetrievalSource::Dense => "dense",
            RetrievalSource::Graph => "graph",
        }
    }
}

impl fmt::Display for RetrievalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chunk with the sources that found it and its fused relevance score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub chunk: Chunk,
    /// Union of sources that returned this chunk
    pub sources: BTreeSet<RetrievalSource>,
    /// Final relevance score (higher is better)
    pub score: f32,
}

impl RetrievedPassage {
    pub fn new(chunk: Chunk, source: RetrievalSource, score: f32) -> Self {
        let mut sources = BTreeSet::new();
        sources.insert(source);
        Self {
            chunk,
            sources,
            score,
        }
    }

    /// Whether any of this passage's sources is in the given set
    pub fn has_any_source(&self, sources: &[RetrievalSource]) -> bool {
        sources.iter().any(|s| self.sources.contains(s))
    }
}
