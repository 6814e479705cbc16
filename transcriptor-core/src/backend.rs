//! Backend boundary.
//!
//! The core never talks to a transport directly. Everything it needs from the
//! assistant backend goes through [`Backend`]: fire-and-forget `send` and
//! `abort`, plus the full-log fetch used by resume mode. Live events arrive
//! separately (see [`crate::session::Session::pump`]).

use crate::error::{Error, Result};
use crate::events::{load_log, RawEvent};
use crate::types::Attachment;
use std::path::{Path, PathBuf};

/// Calls the core makes into the assistant backend.
///
/// `send` and `abort` are one-way: success means the request was handed to
/// the transport, not that the backend acted on it. Outcomes are observed only
/// through later events.
pub trait Backend: Send {
    /// Submit a prompt with optional file attachments.
    fn send(&mut self, prompt: &str, attachments: &[Attachment]) -> Result<()>;

    /// Ask the backend to stop the running generation.
    fn abort(&mut self) -> Result<()>;

    /// Fetch the complete, ordered event log of a finished session.
    ///
    /// ## Error Handling
    ///
    /// - Unknown session ids return [`Error::SessionNotFound`]
    /// - Transport failures return [`Error::Backend`] or [`Error::Io`]
    /// - Malformed individual records are skipped, not returned as errors
    fn get_full_log(&mut self, session_id: &str) -> Result<Vec<RawEvent>>;
}

/// A prompt recorded by [`FileBackend::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentPrompt {
    pub prompt: String,
    pub attachments: Vec<Attachment>,
}

/// Backend over a directory of recorded session logs.
///
/// Session `id` is read from `{root}/{id}.jsonl`, falling back to
/// `{root}/{id}/events.jsonl`. Prompts and aborts are recorded, not delivered.
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    sent: Vec<SentPrompt>,
    aborts: usize,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sent: Vec::new(),
            aborts: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sent(&self) -> &[SentPrompt] {
        &self.sent
    }

    pub fn abort_count(&self) -> usize {
        self.aborts
    }

    /// Path of the log for `session_id`, if one exists.
    pub fn log_path(&self, session_id: &str) -> Option<PathBuf> {
        if session_id.is_empty()
            || session_id.contains(['/', '\\'])
            || session_id == "."
            || session_id == ".."
        {
            return None;
        }

        [
            self.root.join(format!("{}.jsonl", session_id)),
            self.root.join(session_id).join("events.jsonl"),
        ]
        .into_iter()
        .find(|p| p.is_file())
    }

    /// Session ids with a recorded log, sorted.
    pub fn list_sessions(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            let id = if path.is_dir() && path.join("events.jsonl").is_file() {
                path.file_name().and_then(|n| n.to_str()).map(str::to_string)
            } else if path.extension().is_some_and(|ext| ext == "jsonl") {
                path.file_stem().and_then(|n| n.to_str()).map(str::to_string)
            } else {
                None
            };
            ids.extend(id);
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

impl Backend for FileBackend {
    fn send(&mut self, prompt: &str, attachments: &[Attachment]) -> Result<()> {
        tracing::info!(
            chars = prompt.chars().count(),
            attachments = attachments.len(),
            "Recorded prompt"
        );
        self.sent.push(SentPrompt {
            prompt: prompt.to_string(),
            attachments: attachments.to_vec(),
        });
        Ok(())
    }

    fn abort(&mut self) -> Result<()> {
        tracing::info!("Recorded abort");
        self.aborts += 1;
        Ok(())
    }

    fn get_full_log(&mut self, session_id: &str) -> Result<Vec<RawEvent>> {
        let path = self
            .log_path(session_id)
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;
        tracing::debug!(session_id, path = %path.display(), "Loading session log");
        Ok(load_log(&path)?.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_flat_and_nested_layouts() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "flat.jsonl", r#"{"type":"session.idle"}"#);
        write(
            temp.path(),
            "nested/events.jsonl",
            "{\"type\":\"session.idle\"}\n{\"type\":\"session.idle\"}\n",
        );

        let mut backend = FileBackend::new(temp.path());
        assert_eq!(backend.get_full_log("flat").unwrap().len(), 1);
        assert_eq!(backend.get_full_log("nested").unwrap().len(), 2);
        assert_eq!(backend.list_sessions().unwrap(), vec!["flat", "nested"]);
    }

    #[test]
    fn test_unknown_session() {
        let temp = TempDir::new().unwrap();
        let mut backend = FileBackend::new(temp.path());
        assert!(matches!(
            backend.get_full_log("missing"),
            Err(Error::SessionNotFound(id)) if id == "missing"
        ));
        assert!(matches!(
            backend.get_full_log("../etc"),
            Err(Error::SessionNotFound(_))
        ));
    }

    #[test]
    fn test_send_and_abort_are_recorded() {
        let temp = TempDir::new().unwrap();
        let mut backend = FileBackend::new(temp.path());
        backend
            .send("hello", &[Attachment::new("notes.md")])
            .unwrap();
        backend.abort().unwrap();

        assert_eq!(backend.sent().len(), 1);
        assert_eq!(backend.sent()[0].prompt, "hello");
        assert_eq!(backend.sent()[0].attachments[0].path, Path::new("notes.md"));
        assert_eq!(backend.abort_count(), 1);
    }
}
