//! Event classifier: raw backend events to a closed set of semantic kinds.

use super::raw::{
    payload_text, types, MessageData, MessageDeltaData, ModelChangeData, RawEvent,
    SessionErrorData, SessionStartData, ToolCompleteData, ToolStartData, UsageData,
    UserMessageData,
};
use serde::de::DeserializeOwned;

/// Semantic kind of a backend event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Session opened; carries the model selected at start
    SessionStart {
        session_id: Option<String>,
        selected_model: Option<String>,
    },
    /// Prompt text (historical logs only)
    UserMessage { text: String },
    /// Incremental assistant text
    MessageDelta {
        message_id: Option<String>,
        text: String,
    },
    /// Full assistant text; supersedes accumulated deltas
    MessageComplete {
        message_id: Option<String>,
        text: String,
    },
    ToolStart {
        call_id: String,
        tool_name: String,
        arguments: serde_json::Value,
    },
    ToolComplete {
        call_id: String,
        success: bool,
        result: Option<String>,
        error: Option<String>,
    },
    ModelChanged { new_model: String },
    /// Per-reply accounting
    Usage {
        model: Option<String>,
        input_tokens: Option<u64>,
        output_tokens: Option<u64>,
    },
    /// Generation finished
    Idle,
    /// Terminal failure for the current turn
    Error { message: String },
    /// Unknown type or malformed payload; consumers ignore it
    Unrecognized { event_type: String },
}

impl Event {
    /// Short name for log records.
    pub fn name(&self) -> &'static str {
        match self {
            Event::SessionStart { .. } => "session_start",
            Event::UserMessage { .. } => "user_message",
            Event::MessageDelta { .. } => "message_delta",
            Event::MessageComplete { .. } => "message_complete",
            Event::ToolStart { .. } => "tool_start",
            Event::ToolComplete { .. } => "tool_complete",
            Event::ModelChanged { .. } => "model_changed",
            Event::Usage { .. } => "usage",
            Event::Idle => "idle",
            Event::Error { .. } => "error",
            Event::Unrecognized { .. } => "unrecognized",
        }
    }

    /// True for events that end a generation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Idle | Event::Error { .. })
    }
}

/// Classify one raw event. Pure and total.
pub fn classify(raw: &RawEvent) -> Event {
    let unrecognized = |_: serde_json::Error| Event::Unrecognized {
        event_type: raw.event_type.clone(),
    };

    match raw.event_type.as_str() {
        types::SESSION_START => {
            let data: SessionStartData = payload(raw).unwrap_or_default();
            Event::SessionStart {
                session_id: data.session_id,
                selected_model: data.selected_model.filter(|m| !m.is_empty()),
            }
        }
        types::USER_MESSAGE => payload::<UserMessageData>(raw)
            .map(|d| Event::UserMessage { text: d.content })
            .unwrap_or_else(unrecognized),
        types::MESSAGE_DELTA => payload::<MessageDeltaData>(raw)
            .map(|d| Event::MessageDelta {
                message_id: d.message_id,
                text: d.delta_content,
            })
            .unwrap_or_else(unrecognized),
        types::MESSAGE => payload::<MessageData>(raw)
            .map(|d| Event::MessageComplete {
                message_id: d.message_id,
                text: d.content,
            })
            .unwrap_or_else(unrecognized),
        types::TOOL_START => payload::<ToolStartData>(raw)
            .map(|d| Event::ToolStart {
                call_id: d.tool_call_id,
                tool_name: d.tool_name,
                arguments: d.arguments,
            })
            .unwrap_or_else(unrecognized),
        types::TOOL_COMPLETE => payload::<ToolCompleteData>(raw)
            .map(|d| Event::ToolComplete {
                call_id: d.tool_call_id,
                success: d.success,
                result: payload_text(&d.result, "content"),
                error: payload_text(&d.error, "message"),
            })
            .unwrap_or_else(unrecognized),
        types::MODEL_CHANGE => payload::<ModelChangeData>(raw)
            .map(|d| Event::ModelChanged {
                new_model: d.new_model,
            })
            .unwrap_or_else(unrecognized),
        types::USAGE => {
            let data: UsageData = payload(raw).unwrap_or_default();
            Event::Usage {
                model: data.model.filter(|m| !m.is_empty()),
                input_tokens: data.input_tokens.map(token_count),
                output_tokens: data.output_tokens.map(token_count),
            }
        }
        types::SESSION_IDLE => Event::Idle,
        types::SESSION_ERROR => payload::<SessionErrorData>(raw)
            .map(|d| Event::Error { message: d.message })
            .unwrap_or_else(|_| Event::Error {
                message: payload_text(&raw.data, "message")
                    .unwrap_or_else(|| "unknown error".to_string()),
            }),
        _ => Event::Unrecognized {
            event_type: raw.event_type.clone(),
        },
    }
}

fn payload<T: DeserializeOwned>(raw: &RawEvent) -> Result<T, serde_json::Error> {
    serde_json::from_value(raw.data.clone())
}

fn token_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}
