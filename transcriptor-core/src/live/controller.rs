//! Live stream controller.
//!
//! Consumes classified events one at a time, in arrival order, and keeps at
//! most one open assistant message. The controller is `Idle` until the caller
//! opens a message with [`LiveController::begin`] (a user-initiated send) and
//! returns to `Idle` on the backend's `idle` or `error` event.
//!
//! A single generation may carry several backend replies: text, then tool
//! calls, then more text. Each reply is a *segment* of the open message keyed
//! by the backend message id; the bubble shows the segments joined by a blank
//! line. The backend's full `assistant.message` text always replaces whatever
//! its deltas accumulated for that segment.

use super::sink::UiSink;
use crate::error::{Error, Result};
use crate::events::Event;
use crate::tools::{is_internal, Completion, PairingTable, ToolFormatter};
use crate::types::{Message, Role, ToolExecution, ToolStatus};
use chrono::Utc;

const SEGMENT_SEPARATOR: &str = "\n\n";

#[derive(Debug)]
struct Segment {
    backend_id: Option<String>,
    text: String,
    completed: bool,
}

/// How a delta reaches the UI.
#[derive(Debug, PartialEq)]
enum TextUpdate {
    Append(String),
    Replace,
}

#[derive(Debug)]
struct OpenMessage {
    message: Message,
    segments: Vec<Segment>,
    abort_requested: bool,
}

impl OpenMessage {
    fn new(message: Message) -> Self {
        Self {
            message,
            segments: Vec::new(),
            abort_requested: false,
        }
    }

    /// Append a delta and report how the UI should show it.
    ///
    /// Returns `None` for empty chunks and for late deltas of a segment that
    /// is already complete.
    fn append_delta(&mut self, backend_id: Option<&str>, text: &str) -> Option<TextUpdate> {
        if text.is_empty() {
            return None;
        }
        let index = match self.segment_for_delta(backend_id) {
            Some(index) => index,
            None => {
                self.segments.push(Segment {
                    backend_id: backend_id.map(str::to_string),
                    text: String::new(),
                    completed: false,
                });
                self.segments.len() - 1
            }
        };

        let segment = &mut self.segments[index];
        if segment.completed {
            tracing::debug!(
                message_id = ?backend_id,
                "Delta after message completion; keeping the completed text"
            );
            return None;
        }
        if segment.backend_id.is_none() {
            segment.backend_id = backend_id.map(str::to_string);
        }

        let starts_segment = segment.text.is_empty();
        segment.text.push_str(text);

        // Only the last segment can grow at the end of the bubble.
        if index + 1 < self.segments.len() {
            self.message.text = self.full_text();
            return Some(TextUpdate::Replace);
        }

        let chunk = if starts_segment && !self.message.text.is_empty() {
            format!("{}{}", SEGMENT_SEPARATOR, text)
        } else {
            text.to_string()
        };
        self.message.text.push_str(&chunk);
        Some(TextUpdate::Append(chunk))
    }

    fn segment_for_delta(&self, backend_id: Option<&str>) -> Option<usize> {
        if let Some(id) = backend_id {
            if let Some(index) = self
                .segments
                .iter()
                .position(|s| s.backend_id.as_deref() == Some(id))
            {
                return Some(index);
            }
        }

        let last_index = self.segments.len().checked_sub(1)?;
        let last = &self.segments[last_index];
        if last.completed {
            return None;
        }
        match (last.backend_id.as_deref(), backend_id) {
            (Some(open_id), Some(new_id)) if open_id != new_id => {
                tracing::warn!(
                    open_message_id = open_id,
                    message_id = new_id,
                    "Delta for a new message while another is still streaming"
                );
                None
            }
            _ => Some(last_index),
        }
    }

    /// Apply the authoritative text of one backend reply.
    fn complete(&mut self, backend_id: Option<&str>, text: &str) {
        let existing = backend_id
            .and_then(|id| {
                self.segments
                    .iter()
                    .position(|s| s.backend_id.as_deref() == Some(id))
            })
            .or_else(|| {
                let last_index = self.segments.len().checked_sub(1)?;
                let last = &self.segments[last_index];
                let unbound = last.backend_id.is_none() || backend_id.is_none();
                (!last.completed && unbound).then_some(last_index)
            });

        match existing {
            Some(index) => {
                let segment = &mut self.segments[index];
                segment.text = text.to_string();
                segment.completed = true;
                if segment.backend_id.is_none() {
                    segment.backend_id = backend_id.map(str::to_string);
                }
            }
            None => self.segments.push(Segment {
                backend_id: backend_id.map(str::to_string),
                text: text.to_string(),
                completed: true,
            }),
        }

        self.message.text = self.full_text();
    }

    fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(SEGMENT_SEPARATOR)
    }

    fn upsert_tool(&mut self, execution: ToolExecution) {
        let slot = self
            .message
            .tool_executions
            .iter()
            .rposition(|e| e.call_id == execution.call_id && e.status == ToolStatus::Pending);
        match slot {
            Some(index) => self.message.tool_executions[index] = execution,
            None => self.message.tool_executions.push(execution),
        }
    }
}

/// Per-session live-mode state machine.
#[derive(Debug)]
pub struct LiveController {
    open: Option<OpenMessage>,
    table: PairingTable,
    current_model: Option<String>,
    displayed_model: Option<String>,
    last_finished: Option<Message>,
}

impl Default for LiveController {
    fn default() -> Self {
        Self::new(ToolFormatter::default())
    }
}

impl LiveController {
    pub fn new(formatter: ToolFormatter) -> Self {
        Self {
            open: None,
            table: PairingTable::new(formatter),
            current_model: None,
            displayed_model: None,
            last_finished: None,
        }
    }

    /// Start with `model` as both the active and the displayed model.
    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.current_model = model.clone();
        self.displayed_model = model;
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.open.is_some()
    }

    /// Id of the open message, if any.
    pub fn current_message_id(&self) -> Option<&str> {
        self.open.as_ref().map(|o| o.message.id.as_str())
    }

    pub fn open_message(&self) -> Option<&Message> {
        self.open.as_ref().map(|o| &o.message)
    }

    pub fn current_model(&self) -> Option<&str> {
        self.current_model.as_deref()
    }

    pub fn displayed_model(&self) -> Option<&str> {
        self.displayed_model.as_deref()
    }

    /// Number of tool starts still waiting for a completion.
    pub fn pending_tools(&self) -> usize {
        self.table.len()
    }

    /// Message finalized by the most recent `idle` or `error`.
    pub fn take_finished(&mut self) -> Option<Message> {
        self.last_finished.take()
    }

    /// Open the assistant message for a user-initiated send.
    pub fn begin(&mut self, sink: &mut dyn UiSink) -> Result<String> {
        if let Some(open) = &self.open {
            tracing::warn!(
                message_id = %open.message.id,
                "Refusing to open a second message while one is streaming"
            );
            return Err(Error::GenerationInProgress);
        }

        let mut message = Message::new(uuid::Uuid::new_v4().to_string(), Role::Assistant);
        message.timestamp = Some(Utc::now());
        message.model = self.current_model.clone();
        let id = message.id.clone();

        let stale = self.table.drain_pending();
        if !stale.is_empty() {
            tracing::debug!(
                stale = stale.len(),
                "Dropping tool starts seen while idle"
            );
        }

        tracing::debug!(message_id = %id, "Opening assistant message");
        sink.open_message(&id, Role::Assistant);
        self.open = Some(OpenMessage::new(message));
        Ok(id)
    }

    /// Record that an abort was sent; the stream still ends on `idle`/`error`.
    pub fn note_abort(&mut self) {
        if let Some(open) = self.open.as_mut() {
            tracing::info!(message_id = %open.message.id, "Abort requested");
            open.abort_requested = true;
        }
    }

    pub fn abort_requested(&self) -> bool {
        self.open.as_ref().is_some_and(|o| o.abort_requested)
    }

    /// Drop all live state: the open message and every cached tool start.
    pub fn reset(&mut self) {
        if let Some(open) = self.open.take() {
            tracing::info!(message_id = %open.message.id, "Discarding open message");
        }
        self.table.clear();
        self.last_finished = None;
    }

    /// Make `model` the active model, notifying the UI if it shows another.
    pub fn sync_model(&mut self, model: Option<&str>, sink: &mut dyn UiSink) {
        self.current_model = model.map(str::to_string);
        if let Some(model) = model {
            if self.displayed_model.as_deref() != Some(model) {
                sink.model_changed(model);
                self.displayed_model = Some(model.to_string());
            }
        }
    }

    /// Apply one event.
    pub fn handle(&mut self, event: &Event, sink: &mut dyn UiSink) {
        match event {
            Event::MessageDelta { message_id, text } => {
                let Some(open) = self.open.as_mut() else {
                    tracing::debug!(message_id = ?message_id, "Dropping delta while idle");
                    return;
                };
                match open.append_delta(message_id.as_deref(), text) {
                    Some(TextUpdate::Append(chunk)) => sink.append_text(&open.message.id, &chunk),
                    Some(TextUpdate::Replace) => {
                        sink.set_full_text(&open.message.id, &open.message.text)
                    }
                    None => {}
                }
            }
            Event::MessageComplete { message_id, text } => {
                let Some(open) = self.open.as_mut() else {
                    tracing::debug!(message_id = ?message_id, "Dropping completed message while idle");
                    return;
                };
                open.complete(message_id.as_deref(), text);
                sink.set_full_text(&open.message.id, &open.message.text);
            }
            Event::ToolStart {
                call_id,
                tool_name,
                arguments,
            } => {
                if is_internal(tool_name) {
                    tracing::trace!(tool = %tool_name, "Skipping internal tool");
                    return;
                }
                self.table.observe_start(call_id, tool_name, arguments.clone());
                let Some(execution) = self.table.pending(call_id) else {
                    return;
                };
                match self.open.as_mut() {
                    Some(open) => {
                        open.upsert_tool(execution.clone());
                        sink.set_tool_status(&open.message.id, &execution);
                    }
                    None => {
                        tracing::debug!(call_id = %call_id, "Tool started while idle; no indicator")
                    }
                }
            }
            Event::ToolComplete {
                call_id,
                success,
                result,
                error,
            } => {
                let completion = Completion {
                    success: *success,
                    result: result.clone(),
                    error: error.clone(),
                };
                let Some(execution) = self.table.observe_complete(call_id, completion) else {
                    return;
                };
                match self.open.as_mut() {
                    Some(open) => {
                        open.upsert_tool(execution.clone());
                        sink.set_tool_status(&open.message.id, &execution);
                    }
                    None => {
                        tracing::debug!(call_id = %call_id, "Tool completed while idle; dropping")
                    }
                }
            }
            Event::Idle => {
                if self.finish() {
                    sink.generation_complete();
                } else {
                    tracing::debug!("Idle while no message is open");
                }
            }
            Event::Error { message } => {
                tracing::warn!(error = %message, "Backend reported an error");
                sink.error(message);
                if self.finish() {
                    sink.generation_complete();
                }
            }
            Event::ModelChanged { new_model } => {
                self.sync_model(Some(new_model.as_str()), sink);
            }
            Event::Usage {
                model: Some(model), ..
            } => {
                self.sync_model(Some(model.as_str()), sink);
            }
            Event::Usage { model: None, .. } => {}
            Event::UserMessage { .. } | Event::SessionStart { .. } => {
                tracing::trace!(event = event.name(), "Ignored in live mode");
            }
            Event::Unrecognized { event_type } => {
                tracing::trace!(event_type = %event_type, "Ignoring unrecognized event");
            }
        }
    }

    /// Close the open message, if any. Returns whether one was open.
    fn finish(&mut self) -> bool {
        let Some(mut open) = self.open.take() else {
            return false;
        };

        let unresolved: Vec<String> = self
            .table
            .drain_pending()
            .into_iter()
            .map(|e| e.call_id)
            .collect();
        if !unresolved.is_empty() {
            tracing::debug!(?unresolved, "Tool calls still pending at end of generation");
        }

        open.message.text = open.full_text();
        open.message.model = self.current_model.clone();
        tracing::debug!(
            message_id = %open.message.id,
            aborted = open.abort_requested,
            "Generation finished"
        );
        self.last_finished = Some(open.message);
        true
    }
}
