//! Wire-level event records.
//!
//! Every backend event shares an envelope (`id`, `timestamp`, `type`,
//! `parentId`) around a `data` payload whose shape depends on `type`. The
//! envelope is kept verbatim so the classifier can be re-run and logs can be
//! written back out unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event type strings understood by the classifier.
pub mod types {
    pub const SESSION_START: &str = "session.start";
    pub const SESSION_IDLE: &str = "session.idle";
    pub const SESSION_ERROR: &str = "session.error";
    pub const MODEL_CHANGE: &str = "session.model_change";
    pub const USER_MESSAGE: &str = "user.message";
    pub const MESSAGE_DELTA: &str = "assistant.message_delta";
    pub const MESSAGE: &str = "assistant.message";
    pub const USAGE: &str = "assistant.usage";
    pub const TOOL_START: &str = "tool.execution_start";
    pub const TOOL_COMPLETE: &str = "tool.execution_complete";
}

/// One event exactly as the backend emitted it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// RFC 3339 timestamp, kept as text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl RawEvent {
    /// Create an event with no envelope metadata.
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: None,
            timestamp: None,
            event_type: event_type.into(),
            parent_id: None,
            data,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Parsed emission time; `None` when missing or not RFC 3339.
    pub fn emitted_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Model recorded in the payload, if any.
    ///
    /// `session.start` carries `selectedModel`; other events may carry `model`.
    pub fn embedded_model(&self) -> Option<&str> {
        ["selectedModel", "model"]
            .iter()
            .filter_map(|key| self.data.get(*key).and_then(|v| v.as_str()))
            .find(|s| !s.is_empty())
    }
}

// ============================================
// Payloads (serde deserialization)
// ============================================

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct SessionStartData {
    pub session_id: Option<String>,
    pub selected_model: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UserMessageData {
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageDeltaData {
    #[serde(default)]
    pub message_id: Option<String>,
    pub delta_content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MessageData {
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ToolStartData {
    pub tool_call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ToolCompleteData {
    pub tool_call_id: String,
    pub success: bool,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub error: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ModelChangeData {
    pub new_model: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct UsageData {
    pub model: Option<String>,
    pub input_tokens: Option<f64>,
    pub output_tokens: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionErrorData {
    pub message: String,
}

/// Flatten a result/error payload into display text.
///
/// Backends send either a bare string or an object with `content` (results)
/// or `message` (errors).
pub(crate) fn payload_text(value: &serde_json::Value, key: &str) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => match map.get(key) {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        },
        other => Some(other.to_string()),
    }
}
