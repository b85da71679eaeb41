//! Prompt rendering, the Ollama client, and citation handling

pub mod citation;
pub mod ollama;
pub mod prompt;

pub use citation::{cited_indices, strip_citation_markers};
pub use ollama::OllamaClient;
pub use prompt::{PromptTemplate, RenderedPrompt};
