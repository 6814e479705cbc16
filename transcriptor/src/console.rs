//! UI sink that prints every update as it happens.

use crate::render;
use transcriptor_core::live::{UiDelta, UiSink};
use transcriptor_core::{Message, Role, ToolExecution};

/// Prints each UI call as a text line, or as one JSON object per line.
pub struct ConsoleSink {
    json: bool,
    emitted: usize,
}

impl ConsoleSink {
    pub fn new(json: bool) -> Self {
        Self { json, emitted: 0 }
    }

    /// Number of updates printed so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn emit(&mut self, delta: UiDelta) {
        self.emitted += 1;
        if !self.json {
            println!("{}", render::delta_line(&delta));
            return;
        }
        match serde_json::to_string(&delta) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize UI update"),
        }
    }
}

impl UiSink for ConsoleSink {
    fn open_message(&mut self, id: &str, role: Role) {
        self.emit(UiDelta::OpenMessage {
            id: id.to_string(),
            role,
        });
    }

    fn append_text(&mut self, id: &str, chunk: &str) {
        self.emit(UiDelta::AppendText {
            id: id.to_string(),
            chunk: chunk.to_string(),
        });
    }

    fn set_full_text(&mut self, id: &str, text: &str) {
        self.emit(UiDelta::SetFullText {
            id: id.to_string(),
            text: text.to_string(),
        });
    }

    fn set_tool_status(&mut self, id: &str, execution: &ToolExecution) {
        self.emit(UiDelta::SetToolStatus {
            id: id.to_string(),
            execution: execution.clone(),
        });
    }

    fn generation_complete(&mut self) {
        self.emit(UiDelta::GenerationComplete);
    }

    fn error(&mut self, message: &str) {
        self.emit(UiDelta::Error {
            message: message.to_string(),
        });
    }

    fn transcript_ready(&mut self, messages: &[Message]) {
        self.emit(UiDelta::TranscriptReady {
            messages: messages.to_vec(),
        });
    }

    fn model_changed(&mut self, model: &str) {
        self.emit(UiDelta::ModelChanged {
            model: model.to_string(),
        });
    }
}
