//! Tool execution handling shared by live and resume mode.

pub mod format;
pub mod pairing;

pub use format::{describe, humanize, ToolCategory, ToolFormatter};
pub use pairing::{Completion, PairingTable, PendingTool};

/// Tools the backend uses for its own bookkeeping; never shown to the user.
pub const INTERNAL_TOOLS: &[&str] = &["report_intent", "update_session_title", "task_complete"];

/// True when `tool_name` is on the internal allow-list.
pub fn is_internal(tool_name: &str) -> bool {
    INTERNAL_TOOLS.contains(&tool_name)
}
