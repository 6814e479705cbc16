//! Core domain types for transcriptor
//!
//! These types are what the two engines hand to the host UI: live mode mutates
//! one open [`Message`] at a time, resume mode produces a finished
//! [`Transcript`].
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Turn** | One user prompt plus all assistant and tool activity up to the next prompt |
//! | **Message** | One chat bubble, either the user prompt or one assistant reply |
//! | **Tool execution** | One call/response pair to a capability invoked mid-reply |
//! | **Live mode** | Processing events as they arrive during a generation |
//! | **Resume mode** | Rebuilding a finished session from its complete event log |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================
// Messages
// ============================================

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One chat bubble handed to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Stable identifier (backend message id when known)
    pub id: String,
    pub role: Role,
    pub text: String,
    /// Model that produced the reply (assistant messages only)
    pub model: Option<String>,
    /// When the defining event was emitted, if the log carried a timestamp
    pub timestamp: Option<DateTime<Utc>>,
    /// Tool executions attributed to this message's turn
    pub tool_executions: Vec<ToolExecution>,
}

impl Message {
    /// Create an empty message with the given id and role.
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            text: String::new(),
            model: None,
            timestamp: None,
            tool_executions: Vec::new(),
        }
    }

    /// True when the message would render as a blank bubble.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Returns a preview of the text, truncated to `max_chars` characters.
    pub fn preview(&self, max_chars: usize) -> String {
        let first_line = self.text.lines().next().unwrap_or("");
        if first_line.chars().count() > max_chars {
            let truncated: String = first_line.chars().take(max_chars).collect();
            format!("{}...", truncated)
        } else {
            first_line.to_string()
        }
    }
}

// ============================================
// Tool executions
// ============================================

/// Lifecycle of a tool execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    /// Start seen, no completion yet
    Pending,
    Succeeded,
    Failed,
}

impl ToolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolStatus::Pending => "pending",
            ToolStatus::Succeeded => "succeeded",
            ToolStatus::Failed => "failed",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, ToolStatus::Pending)
    }
}

impl std::str::FromStr for ToolStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ToolStatus::Pending),
            "succeeded" | "success" => Ok(ToolStatus::Succeeded),
            "failed" | "error" => Ok(ToolStatus::Failed),
            _ => Err(format!("unknown tool status: {}", s)),
        }
    }
}

/// Label/detail pair shown for a tool execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDisplay {
    pub label: String,
    pub detail: Option<String>,
}

/// One tool call as surfaced to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecution {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
    pub status: ToolStatus,
    pub result: Option<String>,
    pub error: Option<String>,
    pub display: ToolDisplay,
}

// ============================================
// Session-level outputs
// ============================================

/// A file attached to a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub path: PathBuf,
    pub display_name: Option<String>,
}

impl Attachment {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            display_name: None,
        }
    }
}

/// A finished, reconstructed session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Messages in original order, blank ones removed
    pub messages: Vec<Message>,
    /// Model attached to the final assistant message
    pub last_used_model: Option<String>,
}

impl Transcript {
    pub fn user_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role == Role::User)
    }

    pub fn assistant_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.role == Role::Assistant)
    }
}
