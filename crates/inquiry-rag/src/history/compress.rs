//! Bounded-context history compression
//!
//! Works on a copy of the history for one request. Persisted turns are never
//! touched.

use std::sync::Arc;
use std::time::Duration;

use crate::config::HistoryConfig;
use crate::providers::llm::{generate_with_timeout, LlmOutcome, LlmProvider, LlmRequest};
use crate::types::conversation::format_turns;
use crate::types::Turn;

const SUMMARY_SYSTEM: &str = "Summarize the conversation below in a short paragraph. \
Keep the facts, names, and open questions a follow-up answer would need.";

/// Working copy of a conversation for one request
#[derive(Debug, Clone, PartialEq)]
pub struct CompressedHistory {
    pub turns: Vec<Turn>,
    /// Older turns were condensed by a summarization call
    pub summarized: bool,
    pub tokens_used: u32,
}

/// Keeps recent turns verbatim and condenses the rest into one turn
pub struct HistoryCompressor {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
    recency_threshold: usize,
    verbatim_char_budget: usize,
}

impl HistoryCompressor {
    pub fn new(llm: Arc<dyn LlmProvider>, timeout: Duration, config: &HistoryConfig) -> Self {
        Self {
            llm,
            timeout,
            recency_threshold: config.recency_threshold,
            verbatim_char_budget: config.verbatim_char_budget,
        }
    }

    /// Compress `history` to at most `recency_threshold + 1` turns
    ///
    /// Older turns that fit the verbatim budget are folded into the head
    /// turn as-is; larger ones are summarized. If summarization fails only
    /// the recent turns are kept.
    pub async fn compress(&self, history: &[Turn]) -> CompressedHistory {
        if history.len() <= self.recency_threshold {
            return CompressedHistory {
                turns: history.to_vec(),
                summarized: false,
                tokens_used: 0,
            };
        }

        let split = history.len() - self.recency_threshold;
        let (older, recent) = history.split_at(split);
        let older_text = format_turns(older);
        let older_chars = older.iter().map(|t| t.content.chars().count()).sum::<usize>();

        let mut turns = Vec::with_capacity(self.recency_threshold + 1);

        if older_chars <= self.verbatim_char_budget {
            turns.push(Turn::summary(older_text));
            turns.extend_from_slice(recent);
            return CompressedHistory {
                turns,
                summarized: false,
                tokens_used: 0,
            };
        }

        let request = LlmRequest::new(older_text)
            .with_system(SUMMARY_SYSTEM)
            .with_temperature(0.2)
            .with_max_tokens(512);

        let (summarized, tokens_used) =
            match generate_with_timeout(self.llm.as_ref(), &request, self.timeout).await {
                LlmOutcome::Completed { text, tokens_used } if !text.trim().is_empty() => {
                    turns.push(Turn::summary(text.trim()));
                    (true, tokens_used)
                }
                LlmOutcome::Completed { tokens_used, .. } => {
                    tracing::warn!("History summary was empty, keeping recent turns only");
                    (false, tokens_used)
                }
                LlmOutcome::Unavailable { reason } => {
                    tracing::warn!("History summary skipped ({}), keeping recent turns only", reason);
                    (false, 0)
                }
                LlmOutcome::ProviderError { message } => {
                    tracing::warn!("History summary failed ({}), keeping recent turns only", message);
                    (false, 0)
                }
            };

        turns.extend_from_slice(recent);
        tracing::debug!(
            "Compressed {} turns to {} (summarized: {})",
            history.len(),
            turns.len(),
            summarized
        );

        CompressedHistory {
            turns,
            summarized,
            tokens_used,
        }
    }
}
