//! Conversation turns and history normalization
//!
//! History arrives from callers in several loose shapes (`role`/`speaker`
//! strings, an `is_user` flag, text under `content`/`text`/`message`).
//! Everything is normalized into [`Turn`] before any core logic runs.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Who spoke a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Parse the role spellings seen in stored histories
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "user" | "human" => Some(Role::User),
            "assistant" | "ai" | "bot" | "model" => Some(Role::Assistant),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Document the turn referred to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<Uuid>,
    /// Set on the synthetic turn produced by history compression
    #[serde(default)]
    pub is_summary: bool,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            document_id: None,
            is_summary: false,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            document_id: None,
            is_summary: false,
        }
    }

    /// Synthetic turn standing in for compressed older history
    pub fn summary(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            document_id: None,
            is_summary: true,
        }
    }

    /// Normalize one loosely-shaped history entry
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::precondition("history entry must be an object"))?;

        let role = if let Some(raw) = obj
            .get("role")
            .or_else(|| obj.get("speaker"))
            .and_then(Value::as_str)
        {
            Role::parse(raw)
                .ok_or_else(|| Error::precondition(format!("unknown history role '{}'", raw)))?
        } else if let Some(is_user) = obj.get("is_user").and_then(Value::as_bool) {
            if is_user {
                Role::User
            } else {
                Role::Assistant
            }
        } else {
            return Err(Error::precondition("history entry has no role"));
        };

        let content = ["content", "text", "message"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))
            .ok_or_else(|| Error::precondition("history entry has no text"))?
            .to_string();

        let document_id = obj
            .get("document_id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok());

        Ok(Self {
            role,
            content,
            document_id,
            is_summary: false,
        })
    }
}

/// Normalize a whole history, preserving order
pub fn normalize_history(entries: &[Value]) -> Result<Vec<Turn>> {
    entries.iter().map(Turn::from_value).collect()
}

/// Render turns as `Role: text` lines for prompts
pub fn format_turns(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| {
            if t.is_summary {
                format!("Earlier conversation (summary): {}", t.content)
            } else {
                format!("{}: {}", t.role.label(), t.content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
