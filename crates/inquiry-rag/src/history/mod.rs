//! Conversation history: query rewriting and compression

mod compress;
mod rewrite;

pub use compress::{CompressedHistory, HistoryCompressor};
pub use rewrite::{accept_rewrite, QueryRewriter, Rewrite};
