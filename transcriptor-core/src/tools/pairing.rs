//! Tool pairing table.
//!
//! Tool starts and completions arrive as separate events, and completions do
//! not repeat the tool name or arguments. The table caches each start by call
//! id until its completion arrives, then hands back the merged record.
//!
//! Entries are removed as soon as their completion is consumed. Whatever is
//! left when the owner closes (end of a turn, end of a live session) is either
//! drained as pending executions or cleared.

use super::format::ToolFormatter;
use crate::types::{ToolExecution, ToolStatus};
use serde_json::Value;
use std::collections::HashMap;

/// A cached tool start awaiting its completion.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTool {
    pub call_id: String,
    pub tool_name: String,
    pub arguments: Value,
    seq: u64,
}

/// The completion half of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub success: bool,
    pub result: Option<String>,
    pub error: Option<String>,
}

/// Call id -> start payload cache.
#[derive(Debug, Default)]
pub struct PairingTable {
    entries: HashMap<String, PendingTool>,
    next_seq: u64,
    formatter: ToolFormatter,
}

impl PairingTable {
    pub fn new(formatter: ToolFormatter) -> Self {
        Self {
            entries: HashMap::new(),
            next_seq: 0,
            formatter,
        }
    }

    /// Record a tool start. Last write wins: an existing entry with the same
    /// call id is replaced and returned.
    pub fn observe_start(
        &mut self,
        call_id: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Option<PendingTool> {
        let seq = self.next_seq;
        self.next_seq += 1;

        let replaced = self.entries.insert(
            call_id.to_string(),
            PendingTool {
                call_id: call_id.to_string(),
                tool_name: tool_name.to_string(),
                arguments,
                seq,
            },
        );
        if let Some(old) = &replaced {
            tracing::warn!(
                call_id,
                previous_tool = %old.tool_name,
                tool = tool_name,
                "Tool call id reused before completion; keeping the latest start"
            );
        }
        replaced
    }

    /// Merge a completion with its cached start and drop the entry.
    ///
    /// Returns `None` when no start is cached for `call_id`.
    pub fn observe_complete(
        &mut self,
        call_id: &str,
        completion: Completion,
    ) -> Option<ToolExecution> {
        let Some(start) = self.entries.remove(call_id) else {
            tracing::debug!(call_id, "Tool completion without a known start; dropping");
            return None;
        };

        let status = if completion.success {
            ToolStatus::Succeeded
        } else {
            ToolStatus::Failed
        };
        let shown = match status {
            ToolStatus::Failed => completion.error.as_deref().or(completion.result.as_deref()),
            _ => completion.result.as_deref(),
        };
        let display = self
            .formatter
            .describe(&start.tool_name, status, &start.arguments, shown);

        Some(ToolExecution {
            call_id: start.call_id,
            tool_name: start.tool_name,
            arguments: start.arguments,
            status,
            result: completion.result,
            error: completion.error,
            display,
        })
    }

    /// Pending execution record for a cached start.
    pub fn pending(&self, call_id: &str) -> Option<ToolExecution> {
        self.entries.get(call_id).map(|start| self.pending_execution(start))
    }

    /// Remove every unresolved entry, returning them as pending executions in
    /// the order their starts were observed.
    pub fn drain_pending(&mut self) -> Vec<ToolExecution> {
        let mut starts: Vec<PendingTool> = self.entries.drain().map(|(_, v)| v).collect();
        starts.sort_by_key(|s| s.seq);
        starts
            .iter()
            .map(|start| self.pending_execution(start))
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn formatter(&self) -> &ToolFormatter {
        &self.formatter
    }

    fn pending_execution(&self, start: &PendingTool) -> ToolExecution {
        ToolExecution {
            call_id: start.call_id.clone(),
            tool_name: start.tool_name.clone(),
            arguments: start.arguments.clone(),
            status: ToolStatus::Pending,
            result: None,
            error: None,
            display: self.formatter.describe(
                &start.tool_name,
                ToolStatus::Pending,
                &start.arguments,
                None,
            ),
        }
    }
}
