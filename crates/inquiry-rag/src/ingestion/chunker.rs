//! Text chunking with sentence boundaries and overlap
//!
//! Sizes are measured in characters, not bytes, so CJK text chunks to the
//! same visual length as Latin text.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, Document};

/// A chunk's text with character offsets into the source
#[derive(Debug, Clone, PartialEq)]
struct Span {
    text: String,
    start: usize,
    end: usize,
}

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Target chunk size in characters
    chunk_size: usize,
    /// Overlap between chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; overlap is clamped below the chunk size
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split text into ordered, overlapping chunks
    ///
    /// Deterministic for identical `(text, size, overlap)`; no chunk exceeds
    /// `chunk_size` characters.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.spans(text).into_iter().map(|s| s.text).collect()
    }

    /// Chunk a document, assigning contiguous ordinals from 0
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        self.spans(&doc.content)
            .into_iter()
            .enumerate()
            .map(|(i, span)| {
                Chunk::new(doc.id, i as u32, span.text).with_offsets(span.start, span.end)
            })
            .collect()
    }

    fn spans(&self, text: &str) -> Vec<Span> {
        let mut spans = Vec::new();

        let mut current = String::new();
        let mut current_len = 0usize;
        let mut current_start = 0usize;
        let mut char_pos = 0usize;

        for piece in self.pieces(text) {
            let piece_len = piece.chars().count();

            // If adding this piece exceeds chunk size, save current chunk
            if current_len > 0 && current_len + piece_len > self.chunk_size {
                push_span(&mut spans, &current, current_start, char_pos);

                // Start new chunk with overlap
                current = self.overlap_text(&current);
                current_len = current.chars().count();
                current_start = char_pos - current_len;
            }

            current.push_str(piece);
            current_len += piece_len;
            char_pos += piece_len;
        }

        push_span(&mut spans, &current, current_start, char_pos);
        spans
    }

    /// Sentences, with any sentence too long to fit after an overlap cut
    /// into fixed-width windows
    fn pieces<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let window = self.chunk_size - self.overlap;
        let mut pieces = Vec::new();

        for sentence in text.split_sentence_bounds() {
            if sentence.chars().count() <= window {
                pieces.push(sentence);
                continue;
            }

            let mut start = 0usize;
            for (count, (idx, _)) in sentence.char_indices().enumerate() {
                if count > 0 && count % window == 0 {
                    pieces.push(&sentence[start..idx]);
                    start = idx;
                }
            }
            pieces.push(&sentence[start..]);
        }

        pieces
    }

    /// Tail of a chunk carried into the next one
    fn overlap_text(&self, text: &str) -> String {
        if self.overlap == 0 {
            return String::new();
        }

        let total = text.chars().count();
        if total <= self.overlap {
            return text.to_string();
        }

        let skip = total - self.overlap;
        let tail: String = text.chars().skip(skip).collect();

        // Try to start at a sentence boundary, then a word boundary
        if let Some(pos) = tail.find(". ") {
            let rest = &tail[pos + 2..];
            if !rest.trim().is_empty() {
                return rest.to_string();
            }
        }
        if let Some(pos) = tail.find(' ') {
            let rest = &tail[pos + 1..];
            if !rest.trim().is_empty() {
                return rest.to_string();
            }
        }

        tail
    }
}

fn push_span(spans: &mut Vec<Span>, raw: &str, start: usize, end: usize) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }

    let leading = raw.chars().take_while(|c| c.is_whitespace()).count();
    let trailing = raw.chars().rev().take_while(|c| c.is_whitespace()).count();

    spans.push(Span {
        text: trimmed.to_string(),
        start: start + leading,
        end: end - trailing,
    });
}
