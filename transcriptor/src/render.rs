//! Plain-text rendering for transcripts and live UI updates.

use transcriptor_core::live::UiDelta;
use transcriptor_core::{Message, Role, ToolExecution, ToolStatus, Transcript};

/// Role prefix for message rows.
pub fn role_prefix(role: Role) -> &'static str {
    match role {
        Role::User => "[user]",
        Role::Assistant => "[assistant]",
    }
}

/// Status marker for tool rows.
pub fn status_marker(status: ToolStatus) -> &'static str {
    match status {
        ToolStatus::Pending => "…",
        ToolStatus::Succeeded => "✓",
        ToolStatus::Failed => "✗",
    }
}

/// One indented line describing a tool execution.
pub fn tool_line(execution: &ToolExecution) -> String {
    let marker = status_marker(execution.status);
    match &execution.display.detail {
        Some(detail) => format!("    {} {} ({})", marker, execution.display.label, detail),
        None => format!("    {} {}", marker, execution.display.label),
    }
}

/// Header line plus body for one message.
pub fn message_block(msg: &Message) -> String {
    let mut out = String::from(role_prefix(msg.role));
    if let Some(model) = &msg.model {
        out.push_str(&format!(" ({})", model));
    }
    out.push('\n');
    for execution in &msg.tool_executions {
        out.push_str(&tool_line(execution));
        out.push('\n');
    }
    for line in msg.text.lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Full transcript as text.
///
/// Tool rows are shown once per turn, under the first assistant message that
/// carries them.
pub fn transcript_text(transcript: &Transcript) -> String {
    let mut out = String::new();
    let mut tools_shown = false;
    for msg in &transcript.messages {
        if msg.role == Role::User {
            tools_shown = false;
            out.push_str(&message_block(msg));
            continue;
        }
        if tools_shown {
            let mut bare = msg.clone();
            bare.tool_executions.clear();
            out.push_str(&message_block(&bare));
        } else {
            out.push_str(&message_block(msg));
            tools_shown = !msg.tool_executions.is_empty();
        }
    }
    if let Some(model) = &transcript.last_used_model {
        out.push_str(&format!("-- last model: {}\n", model));
    }
    out
}

/// One line for a live UI update.
pub fn delta_line(delta: &UiDelta) -> String {
    match delta {
        UiDelta::OpenMessage { id, role } => {
            format!("{} open {}", role_prefix(*role), short_id(id))
        }
        UiDelta::AppendText { chunk, .. } => format!("  + {}", chunk.escape_debug()),
        UiDelta::SetFullText { text, .. } => {
            format!("  = {}", truncate_preview(&text.escape_debug().to_string(), 80))
        }
        UiDelta::SetToolStatus { execution, .. } => tool_line(execution),
        UiDelta::GenerationComplete => "-- generation complete".to_string(),
        UiDelta::Error { message } => format!("!! {}", message),
        UiDelta::TranscriptReady { messages } => {
            format!("-- transcript ready ({} messages)", messages.len())
        }
        UiDelta::ModelChanged { model } => format!("-- model: {}", model),
    }
}

fn short_id(id: &str) -> &str {
    truncate_preview(id, 8)
}

fn truncate_preview(input: &str, max_chars: usize) -> &str {
    if input.chars().count() <= max_chars {
        return input;
    }
    input
        .char_indices()
        .nth(max_chars)
        .map(|(idx, _)| &input[..idx])
        .unwrap_or(input)
}
