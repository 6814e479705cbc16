//! Session orchestration.
//!
//! A [`Session`] ties one [`Backend`] to one [`LiveController`] and owns the
//! switch between live mode and resume mode. Events are handled strictly one
//! at a time; live state is torn down before a resume rebuilds the transcript.

use crate::backend::Backend;
use crate::config::Config;
use crate::error::Result;
use crate::events::{classify, Event, RawEvent};
use crate::live::{LiveController, UiSink};
use crate::tools::ToolFormatter;
use crate::transcript::Reconstructor;
use crate::types::{Attachment, Transcript};
use tokio::sync::mpsc;

/// One conversation with the assistant backend.
#[derive(Debug)]
pub struct Session<B: Backend> {
    backend: B,
    controller: LiveController,
    reconstructor: Reconstructor,
    session_id: Option<String>,
}

impl<B: Backend> Session<B> {
    pub fn new(backend: B) -> Self {
        Self::with_formatter(backend, ToolFormatter::default(), None)
    }

    /// Build a session from user configuration.
    pub fn from_config(backend: B, config: &Config) -> Self {
        Self::with_formatter(
            backend,
            ToolFormatter::new(config.display.truncate_chars),
            config.session.default_model.clone(),
        )
    }

    pub fn with_formatter(
        backend: B,
        formatter: ToolFormatter,
        default_model: Option<String>,
    ) -> Self {
        Self {
            backend,
            controller: LiveController::new(formatter).with_model(default_model),
            reconstructor: Reconstructor::new(formatter),
            session_id: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn controller(&self) -> &LiveController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut LiveController {
        &mut self.controller
    }

    /// Id of the most recently resumed session.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Open a reply bubble and hand the prompt to the backend.
    ///
    /// Fails with [`crate::Error::GenerationInProgress`] while a reply is
    /// still streaming. A transport failure is reported through the sink like
    /// a backend `error` event, so the UI does not wait for a reply that will
    /// never come, and is also returned.
    pub fn send(
        &mut self,
        prompt: &str,
        attachments: &[Attachment],
        sink: &mut dyn UiSink,
    ) -> Result<String> {
        let message_id = self.controller.begin(sink)?;

        if let Err(e) = self.backend.send(prompt, attachments) {
            tracing::error!(error = %e, "Failed to send prompt");
            self.controller.handle(
                &Event::Error {
                    message: e.to_string(),
                },
                sink,
            );
            return Err(e);
        }
        Ok(message_id)
    }

    /// Ask the backend to stop. The reply still ends on `idle` or `error`.
    pub fn abort(&mut self) -> Result<()> {
        self.backend.abort()?;
        self.controller.note_abort();
        Ok(())
    }

    /// Apply one live event.
    pub fn handle_raw(&mut self, raw: &RawEvent, sink: &mut dyn UiSink) {
        let event = classify(raw);
        tracing::trace!(event = event.name(), id = ?raw.id, "Live event");
        self.controller.handle(&event, sink);
    }

    /// Apply live events from `events` until the channel closes.
    ///
    /// Returns the number of events handled.
    pub async fn pump(
        &mut self,
        events: &mut mpsc::Receiver<RawEvent>,
        sink: &mut dyn UiSink,
    ) -> usize {
        let mut handled = 0;
        while let Some(raw) = events.recv().await {
            self.handle_raw(&raw, sink);
            handled += 1;
        }
        tracing::debug!(handled, "Event stream closed");
        handled
    }

    /// Replace live state with the reconstructed transcript of `session_id`.
    ///
    /// A failed fetch is returned as-is and nothing is delivered to the sink.
    pub fn resume(&mut self, session_id: &str, sink: &mut dyn UiSink) -> Result<Transcript> {
        self.controller.reset();

        let log = self.backend.get_full_log(session_id).map_err(|e| {
            tracing::warn!(session_id, error = %e, "Failed to fetch session log");
            e
        })?;
        let transcript = self.reconstructor.run(&log);

        tracing::info!(
            session_id,
            messages = transcript.messages.len(),
            "Resumed session"
        );
        sink.transcript_ready(&transcript.messages);
        if let Some(model) = transcript.last_used_model.as_deref() {
            self.controller.sync_model(Some(model), sink);
        }

        self.session_id = Some(session_id.to_string());
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FileBackend;
    use crate::error::Error;
    use crate::events::types;
    use crate::live::UiDelta;
    use serde_json::json;
    use tempfile::TempDir;

    /// Backend whose transport is down.
    struct OfflineBackend;

    impl Backend for OfflineBackend {
        fn send(&mut self, _prompt: &str, _attachments: &[Attachment]) -> Result<()> {
            Err(Error::Backend("connection refused".into()))
        }

        fn abort(&mut self) -> Result<()> {
            Err(Error::Backend("connection refused".into()))
        }

        fn get_full_log(&mut self, _session_id: &str) -> Result<Vec<RawEvent>> {
            Err(Error::Backend("connection refused".into()))
        }
    }

    fn session_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        let lines = [
            json!({"type": "session.start", "data": {"selectedModel": "m1"}}),
            json!({"id": "u1", "type": "user.message", "data": {"content": "hi"}}),
            json!({"type": "assistant.message", "data": {"messageId": "r1", "content": "hello"}}),
            json!({"type": "assistant.usage", "data": {"model": "m2"}}),
        ];
        let body: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
        std::fs::write(temp.path().join("s1.jsonl"), body.join("\n")).unwrap();
        temp
    }

    #[test]
    fn test_send_opens_message_and_records_prompt() {
        let temp = TempDir::new().unwrap();
        let mut session = Session::new(FileBackend::new(temp.path()));
        let mut sink: Vec<UiDelta> = Vec::new();

        let id = session.send("hello", &[], &mut sink).unwrap();
        assert_eq!(session.controller().current_message_id(), Some(id.as_str()));
        assert_eq!(session.backend().sent()[0].prompt, "hello");

        assert!(matches!(
            session.send("again", &[], &mut sink),
            Err(Error::GenerationInProgress)
        ));
        assert_eq!(session.backend().sent().len(), 1);
    }

    #[test]
    fn test_failed_send_ends_generation() {
        let mut session = Session::new(OfflineBackend);
        let mut sink: Vec<UiDelta> = Vec::new();

        assert!(session.send("hello", &[], &mut sink).is_err());
        assert!(!session.controller().is_streaming());
        assert_eq!(sink.last(), Some(&UiDelta::GenerationComplete));
        assert!(sink.iter().any(|d| matches!(d, UiDelta::Error { .. })));
    }

    #[test]
    fn test_abort_failure_leaves_stream_untouched() {
        let mut session = Session::new(OfflineBackend);
        assert!(session.abort().is_err());
        assert!(!session.controller().abort_requested());
    }

    #[test]
    fn test_resume_delivers_batch_and_resyncs_model() {
        let temp = session_dir();
        let mut session = Session::with_formatter(
            FileBackend::new(temp.path()),
            ToolFormatter::default(),
            Some("default-model".into()),
        );
        let mut sink: Vec<UiDelta> = Vec::new();

        let transcript = session.resume("s1", &mut sink).unwrap();
        assert_eq!(transcript.messages.len(), 2);
        assert_eq!(transcript.last_used_model.as_deref(), Some("m2"));

        assert!(matches!(&sink[0], UiDelta::TranscriptReady { messages } if messages.len() == 2));
        assert_eq!(sink[1], UiDelta::ModelChanged { model: "m2".into() });
        assert_eq!(sink.len(), 2);
        assert_eq!(session.session_id(), Some("s1"));
    }

    #[test]
    fn test_resume_tears_down_live_state() {
        let temp = session_dir();
        let mut session = Session::new(FileBackend::new(temp.path()));
        let mut sink: Vec<UiDelta> = Vec::new();

        session.send("hello", &[], &mut sink).unwrap();
        session.handle_raw(
            &RawEvent::new(
                types::TOOL_START,
                json!({"toolCallId": "c1", "toolName": "bash", "arguments": {}}),
            ),
            &mut sink,
        );
        assert_eq!(session.controller().pending_tools(), 1);

        session.resume("s1", &mut sink).unwrap();
        assert!(!session.controller().is_streaming());
        assert_eq!(session.controller().pending_tools(), 0);
    }

    #[test]
    fn test_resume_failure_emits_nothing() {
        let temp = TempDir::new().unwrap();
        let mut session = Session::new(FileBackend::new(temp.path()));
        let mut sink: Vec<UiDelta> = Vec::new();

        assert!(matches!(
            session.resume("nope", &mut sink),
            Err(Error::SessionNotFound(_))
        ));
        assert!(sink.is_empty());
        assert_eq!(session.session_id(), None);
    }

    #[tokio::test]
    async fn test_pump_handles_events_in_order() {
        let temp = TempDir::new().unwrap();
        let mut session = Session::new(FileBackend::new(temp.path()));
        let mut sink: Vec<UiDelta> = Vec::new();
        let id = session.send("hi", &[], &mut sink).unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        tokio::spawn(async move {
            for event in [
                RawEvent::new(
                    types::MESSAGE_DELTA,
                    json!({"messageId": "r1", "deltaContent": "Hel"}),
                ),
                RawEvent::new(
                    types::MESSAGE_DELTA,
                    json!({"messageId": "r1", "deltaContent": "lo"}),
                ),
                RawEvent::new(types::SESSION_IDLE, json!({})),
            ] {
                tx.send(event).await.unwrap();
            }
        });

        let handled = session.pump(&mut rx, &mut sink).await;
        assert_eq!(handled, 3);
        assert_eq!(
            crate::live::rendered_text(&sink, &id).as_deref(),
            Some("Hello")
        );
        assert_eq!(sink.last(), Some(&UiDelta::GenerationComplete));
    }
}
