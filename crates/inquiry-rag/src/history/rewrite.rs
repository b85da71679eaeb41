//! Standalone query rewriting for follow-up questions

use std::sync::Arc;
use std::time::Duration;

use crate::providers::llm::{generate_with_timeout, LlmOutcome, LlmProvider, LlmRequest};
use crate::types::conversation::format_turns;
use crate::types::Turn;

const REWRITE_SYSTEM: &str = "You rewrite follow-up questions into standalone questions. \
Resolve pronouns and elliptical references using the conversation. Keep the language \
of the question. Output only the rewritten question.";

/// Outcome of a rewrite attempt
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    /// Query to retrieve with; the original when the rewrite was rejected
    pub query: String,
    /// Whether `query` differs from what the user typed
    pub rewritten: bool,
    pub tokens_used: u32,
}

impl Rewrite {
    fn unchanged(original: &str, tokens_used: u32) -> Self {
        Self {
            query: original.to_string(),
            rewritten: false,
            tokens_used,
        }
    }
}

/// Accept a candidate only if it is non-empty and at least `min_ratio` of the
/// original's length (in chars); otherwise keep the original
pub fn accept_rewrite(original: &str, candidate: &str, min_ratio: f32) -> Option<String> {
    let candidate = clean_candidate(candidate);
    if candidate.is_empty() {
        return None;
    }

    let original_len = original.trim().chars().count() as f32;
    let candidate_len = candidate.chars().count() as f32;
    if candidate_len < original_len * min_ratio {
        return None;
    }

    Some(candidate)
}

fn clean_candidate(raw: &str) -> String {
    let line = raw.trim().lines().next().unwrap_or_default().trim();
    let line = ["Standalone question:", "Rewritten question:", "Question:"]
        .iter()
        .find_map(|prefix| line.strip_prefix(prefix))
        .unwrap_or(line)
        .trim();
    line.trim_matches(|c: char| c == '"' || c == '\'' || c == '“' || c == '”')
        .trim()
        .to_string()
}

/// Rewrites follow-ups into standalone queries using recent history
pub struct QueryRewriter {
    llm: Arc<dyn LlmProvider>,
    timeout: Duration,
    min_ratio: f32,
}

impl QueryRewriter {
    pub fn new(llm: Arc<dyn LlmProvider>, timeout: Duration, min_ratio: f32) -> Self {
        Self {
            llm,
            timeout,
            min_ratio,
        }
    }

    /// Rewrite `query` against `history`; never returns an empty query
    pub async fn rewrite(&self, query: &str, history: &[Turn]) -> Rewrite {
        if history.is_empty() || query.trim().is_empty() {
            return Rewrite::unchanged(query, 0);
        }

        let prompt = format!(
            "Conversation:\n{}\n\nFollow-up question: {}\n\nStandalone question:",
            format_turns(history),
            query
        );
        let request = LlmRequest::new(prompt)
            .with_system(REWRITE_SYSTEM)
            .with_temperature(0.0)
            .with_max_tokens(256);

        match generate_with_timeout(self.llm.as_ref(), &request, self.timeout).await {
            LlmOutcome::Completed { text, tokens_used } => {
                match accept_rewrite(query, &text, self.min_ratio) {
                    Some(candidate) if candidate != query.trim() => {
                        tracing::debug!("Rewrote query '{}' -> '{}'", query, candidate);
                        Rewrite {
                            query: candidate,
                            rewritten: true,
                            tokens_used,
                        }
                    }
                    Some(_) => Rewrite::unchanged(query, tokens_used),
                    None => {
                        tracing::warn!("Rejected query rewrite '{}' for '{}'", text.trim(), query);
                        Rewrite::unchanged(query, tokens_used)
                    }
                }
            }
            LlmOutcome::Unavailable { reason } => {
                tracing::warn!("Query rewrite skipped: {}", reason);
                Rewrite::unchanged(query, 0)
            }
            LlmOutcome::ProviderError { message } => {
                tracing::warn!("Query rewrite failed: {}", message);
                Rewrite::unchanged(query, 0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_rewrite_heuristic() {
        let original = "What about its methods?";
        assert_eq!(
            accept_rewrite(original, "What methods does a Python list have?", 0.5).as_deref(),
            Some("What methods does a Python list have?")
        );
        assert_eq!(accept_rewrite(original, "   ", 0.5), None);
        assert_eq!(accept_rewrite(original, "List?", 0.5), None);
    }

    #[test]
    fn test_candidate_cleanup() {
        assert_eq!(
            accept_rewrite("and tuples?", "Standalone question: \"What is a tuple?\"\nextra", 0.5)
                .as_deref(),
            Some("What is a tuple?")
        );
    }
}
