//! Loading recorded event logs.
//!
//! Logs are either JSONL (one event per line, as the backend appends them) or
//! a single JSON array. JSONL loading is resilient: malformed lines are skipped
//! and recorded in [`EventLog::warnings`], so a log that was cut off mid-write
//! still yields every complete event before the damage.

use super::raw::RawEvent;
use crate::error::{Error, Result};
use std::path::Path;

/// Events read from a log plus non-fatal problems found along the way.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<RawEvent>,
    pub warnings: Vec<String>,
}

/// Load a log file from disk.
pub fn load_log(path: &Path) -> Result<EventLog> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to open {}: {}", path.display(), e),
        ))
    })?;

    let log = parse_log(&content)?;
    if !log.warnings.is_empty() {
        tracing::warn!(
            path = %path.display(),
            warnings = log.warnings.len(),
            "Skipped malformed records while loading event log"
        );
    }
    Ok(log)
}

/// Parse log content in either JSONL or JSON array form.
///
/// A malformed JSON array is a hard error; malformed JSONL lines are not.
pub fn parse_log(content: &str) -> Result<EventLog> {
    if content.trim_start().starts_with('[') {
        let events: Vec<RawEvent> = serde_json::from_str(content)?;
        return Ok(EventLog {
            events,
            warnings: Vec::new(),
        });
    }

    let mut log = EventLog::default();
    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;

        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<RawEvent>(line) {
            Ok(event) => log.events.push(event),
            Err(e) => {
                tracing::debug!(line = line_number, error = %e, "Skipping malformed event");
                log.warnings
                    .push(format!("Line {}: JSON parse error: {}", line_number, e));
            }
        }
    }

    Ok(log)
}
