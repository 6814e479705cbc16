//! Human-readable tool labels.
//!
//! [`ToolFormatter::describe`] turns a tool call into a one-line label and an
//! optional detail string. It is total: unknown tools, missing arguments and
//! non-object argument payloads all degrade to the humanized tool name.

use crate::types::{ToolDisplay, ToolStatus};
use serde_json::Value;
use std::path::Path;

/// Default number of characters kept before the ellipsis.
pub const DEFAULT_TRUNCATE_CHARS: usize = 35;
pub const MIN_TRUNCATE_CHARS: usize = 30;
pub const MAX_TRUNCATE_CHARS: usize = 40;

const ELLIPSIS: char = '…';

// Argument aliases, highest priority first.
const PATH_KEYS: &[&str] = &[
    "path",
    "file_path",
    "filePath",
    "filename",
    "file",
    "target_file",
    "uri",
];
const DIR_KEYS: &[&str] = &["path", "directory", "dir", "dirPath"];
const COMMAND_KEYS: &[&str] = &["command", "cmd", "script"];
const QUERY_KEYS: &[&str] = &["pattern", "query", "regex", "search", "q"];
const WEB_KEYS: &[&str] = &["query", "url", "q"];
const CONTENT_KEYS: &[&str] = &["file_text", "content", "text", "contents"];
const OLD_TEXT_KEYS: &[&str] = &["old_str", "old_string"];
const NEW_TEXT_KEYS: &[&str] = &["new_str", "new_string"];

/// Known tool families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCategory {
    FileRead,
    FileWrite,
    FileEdit,
    Shell,
    Search,
    DirectoryList,
    WebSearch,
    Other,
}

impl ToolCategory {
    /// Categorize a tool by its backend name.
    pub fn of(tool_name: &str) -> Self {
        match tool_name {
            "view" | "read" | "read_file" | "Read" => ToolCategory::FileRead,
            "create" | "write" | "write_file" | "create_file" | "Write" => ToolCategory::FileWrite,
            "edit" | "str_replace" | "str_replace_editor" | "edit_file" | "Edit" | "MultiEdit" => {
                ToolCategory::FileEdit
            }
            "bash" | "shell" | "powershell" | "run_command" | "run_in_terminal" | "Bash" => {
                ToolCategory::Shell
            }
            "grep" | "glob" | "search" | "rg" | "file_search" | "Grep" | "Glob" => {
                ToolCategory::Search
            }
            "ls" | "list_dir" | "list_directory" | "LS" => ToolCategory::DirectoryList,
            "web_search" | "web_fetch" | "fetch" | "WebSearch" | "WebFetch" => {
                ToolCategory::WebSearch
            }
            _ => ToolCategory::Other,
        }
    }
}

/// Formats tool executions for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolFormatter {
    max_chars: usize,
}

impl Default for ToolFormatter {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_TRUNCATE_CHARS,
        }
    }
}

impl ToolFormatter {
    /// Create a formatter; `max_chars` is clamped to the supported range.
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars: max_chars.clamp(MIN_TRUNCATE_CHARS, MAX_TRUNCATE_CHARS),
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Describe one tool call.
    ///
    /// For failed executions `result` is expected to carry the error text.
    pub fn describe(
        &self,
        tool_name: &str,
        status: ToolStatus,
        arguments: &Value,
        result: Option<&str>,
    ) -> ToolDisplay {
        let pending = status == ToolStatus::Pending;
        let category = ToolCategory::of(tool_name);

        let label = match category {
            ToolCategory::FileRead => {
                file_label(pending, "Reading", "Read", arg(arguments, PATH_KEYS))
            }
            ToolCategory::FileWrite => {
                file_label(pending, "Creating", "Created", arg(arguments, PATH_KEYS))
            }
            ToolCategory::FileEdit => {
                file_label(pending, "Editing", "Edited", arg(arguments, PATH_KEYS))
            }
            ToolCategory::DirectoryList => {
                let dir = arg(arguments, DIR_KEYS);
                let verb = if pending { "Listing" } else { "Listed" };
                join_label(verb, &dir)
            }
            ToolCategory::Shell => pick(pending, "Running command", "Ran command"),
            ToolCategory::Search => pick(pending, "Searching", "Searched"),
            ToolCategory::WebSearch => pick(pending, "Searching the web", "Searched the web"),
            ToolCategory::Other => {
                let name = humanize(tool_name);
                if pending {
                    format!("{}{}", name, ELLIPSIS)
                } else {
                    name
                }
            }
        };

        let detail = if status == ToolStatus::Failed {
            result
                .filter(|r| !r.trim().is_empty())
                .map(|r| self.truncate(r))
        } else {
            self.detail(category, status, arguments, result)
        };

        ToolDisplay { label, detail }
    }

    fn detail(
        &self,
        category: ToolCategory,
        status: ToolStatus,
        arguments: &Value,
        result: Option<&str>,
    ) -> Option<String> {
        let succeeded = status == ToolStatus::Succeeded;
        match category {
            ToolCategory::FileRead if succeeded => {
                result.map(|r| count_label(r.lines().count(), "line"))
            }
            ToolCategory::FileWrite => {
                let content = arg(arguments, CONTENT_KEYS);
                (!content.is_empty()).then(|| count_label(content.lines().count(), "line"))
            }
            ToolCategory::FileEdit => {
                let old = arg(arguments, OLD_TEXT_KEYS);
                let new = arg(arguments, NEW_TEXT_KEYS);
                if old.is_empty() && new.is_empty() {
                    None
                } else {
                    Some(format!(
                        "-{} +{} lines",
                        old.lines().count(),
                        new.lines().count()
                    ))
                }
            }
            ToolCategory::Shell => self.non_empty_truncated(&arg(arguments, COMMAND_KEYS)),
            ToolCategory::Search => self.non_empty_truncated(&arg(arguments, QUERY_KEYS)),
            ToolCategory::WebSearch => self.non_empty_truncated(&arg(arguments, WEB_KEYS)),
            ToolCategory::DirectoryList if succeeded => result.map(|r| {
                count_label(r.lines().filter(|l| !l.trim().is_empty()).count(), "entry")
            }),
            _ => None,
        }
    }

    fn non_empty_truncated(&self, text: &str) -> Option<String> {
        (!text.is_empty()).then(|| self.truncate(text))
    }

    /// Collapse whitespace and cut to `max_chars` characters plus an ellipsis.
    pub fn truncate(&self, text: &str) -> String {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.chars().count() <= self.max_chars {
            return collapsed;
        }
        let mut out: String = collapsed.chars().take(self.max_chars).collect();
        out.push(ELLIPSIS);
        out
    }
}

/// Describe a tool call with the default formatter.
pub fn describe(
    tool_name: &str,
    status: ToolStatus,
    arguments: &Value,
    result: Option<&str>,
) -> ToolDisplay {
    ToolFormatter::default().describe(tool_name, status, arguments, result)
}

/// Turn a tool name into words: `read_file` -> `Read file`, `webSearch` -> `Web search`.
pub fn humanize(tool_name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for ch in tool_name.chars() {
        if ch == '_' || ch == '-' || ch == '.' || ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }

    let joined = words.join(" ");
    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => "Tool".to_string(),
    }
}

/// First non-empty string argument among `keys`, or an empty string.
fn arg(arguments: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| arguments.get(*key).and_then(|v| v.as_str()))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
        .to_string()
}

fn file_label(pending: bool, active: &str, done: &str, path: String) -> String {
    let verb = if pending { active } else { done };
    join_label(verb, &file_name(&path))
}

fn join_label(verb: &str, object: &str) -> String {
    if object.is_empty() {
        verb.to_string()
    } else {
        format!("{} {}", verb, object)
    }
}

fn pick(pending: bool, active: &str, done: &str) -> String {
    let label = if pending { active } else { done };
    label.to_string()
}

fn file_name(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    Path::new(trimmed)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(trimmed)
        .to_string()
}

fn count_label(count: usize, noun: &str) -> String {
    match (count, noun) {
        (1, _) => format!("1 {}", noun),
        (n, "entry") => format!("{} entries", n),
        (n, _) => format!("{} {}s", n, noun),
    }
}
