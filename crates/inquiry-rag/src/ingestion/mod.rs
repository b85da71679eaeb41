//! Document ingestion: chunking and index construction

mod chunker;
mod processor;

pub use chunker::TextChunker;
pub use processor::{DocumentProcessor, ProcessReport};
