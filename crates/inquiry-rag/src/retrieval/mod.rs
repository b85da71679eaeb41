//! Retrieval: lexical, dense, and graph sources plus fusion

pub mod dense;
pub mod fusion;
pub mod graph;
pub mod index;
pub mod lexical;
pub mod search;
pub mod tokenize;

pub use dense::{DenseHit, DenseIndex, DenseRetriever};
pub use fusion::{FusionEngine, SourceCandidates};
pub use graph::{GraphHits, GraphRetriever};
pub use index::{DocumentIndex, IndexRegistry};
pub use lexical::{Bm25Index, ScoredChunk};
pub use search::{HybridSearcher, SearchResults};
