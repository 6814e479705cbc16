//! UI boundary.
//!
//! Both engines talk to the host UI only through [`UiSink`]. `Vec<UiDelta>`
//! implements it, which is how tests and the CLI observe the exact call
//! sequence.

use crate::types::{Message, Role, ToolExecution};
use serde::{Deserialize, Serialize};

/// Receiver of incremental UI updates.
pub trait UiSink {
    /// A new bubble appears.
    fn open_message(&mut self, id: &str, role: Role);

    /// Streamed text appended to an open bubble.
    fn append_text(&mut self, id: &str, chunk: &str);

    /// Authoritative text for a bubble; replaces anything appended so far.
    /// Also marks the end of the current text stream.
    fn set_full_text(&mut self, id: &str, text: &str);

    fn set_tool_status(&mut self, id: &str, execution: &ToolExecution);

    /// The generation is over; the UI may accept a new prompt.
    fn generation_complete(&mut self);

    fn error(&mut self, message: &str);

    /// A resumed session, delivered as one finished batch.
    fn transcript_ready(&mut self, messages: &[Message]);

    /// The active model differs from what the UI last displayed.
    fn model_changed(&mut self, model: &str);
}

/// One recorded [`UiSink`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UiDelta {
    OpenMessage { id: String, role: Role },
    AppendText { id: String, chunk: String },
    SetFullText { id: String, text: String },
    SetToolStatus { id: String, execution: ToolExecution },
    GenerationComplete,
    Error { message: String },
    TranscriptReady { messages: Vec<Message> },
    ModelChanged { model: String },
}

impl UiSink for Vec<UiDelta> {
    fn open_message(&mut self, id: &str, role: Role) {
        self.push(UiDelta::OpenMessage {
            id: id.to_string(),
            role,
        });
    }

    fn append_text(&mut self, id: &str, chunk: &str) {
        self.push(UiDelta::AppendText {
            id: id.to_string(),
            chunk: chunk.to_string(),
        });
    }

    fn set_full_text(&mut self, id: &str, text: &str) {
        self.push(UiDelta::SetFullText {
            id: id.to_string(),
            text: text.to_string(),
        });
    }

    fn set_tool_status(&mut self, id: &str, execution: &ToolExecution) {
        self.push(UiDelta::SetToolStatus {
            id: id.to_string(),
            execution: execution.clone(),
        });
    }

    fn generation_complete(&mut self) {
        self.push(UiDelta::GenerationComplete);
    }

    fn error(&mut self, message: &str) {
        self.push(UiDelta::Error {
            message: message.to_string(),
        });
    }

    fn transcript_ready(&mut self, messages: &[Message]) {
        self.push(UiDelta::TranscriptReady {
            messages: messages.to_vec(),
        });
    }

    fn model_changed(&mut self, model: &str) {
        self.push(UiDelta::ModelChanged {
            model: model.to_string(),
        });
    }
}

/// Text a UI would show for bubble `id` after applying `deltas` in order.
pub fn rendered_text(deltas: &[UiDelta], id: &str) -> Option<String> {
    let mut text: Option<String> = None;
    for delta in deltas {
        match delta {
            UiDelta::OpenMessage { id: d, .. } if d == id => text = Some(String::new()),
            UiDelta::AppendText { id: d, chunk } if d == id => {
                text.get_or_insert_with(String::new).push_str(chunk)
            }
            UiDelta::SetFullText { id: d, text: full } if d == id => text = Some(full.clone()),
            _ => {}
        }
    }
    text
}
