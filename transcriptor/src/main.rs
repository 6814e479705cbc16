//! transcriptor - replay and stream recorded assistant sessions
//!
//! Runs recorded backend event logs through the same engines a chat UI uses:
//! `replay` resumes a finished session into a transcript, `stream` feeds a log
//! through the live controller turn by turn, and `describe` shows how a single
//! tool call would be labelled.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Sessions: $XDG_DATA_HOME/transcriptor/sessions (~/.local/share/transcriptor/sessions)
//! - Logs: $XDG_STATE_HOME/transcriptor/transcriptor.log (~/.local/state/transcriptor/transcriptor.log)
//! - Config: $XDG_CONFIG_HOME/transcriptor/config.toml (~/.config/transcriptor/config.toml)

mod console;
mod render;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use console::ConsoleSink;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use transcriptor_core::backend::FileBackend;
use transcriptor_core::events::{classify, load_log, Event, RawEvent};
use transcriptor_core::live::UiDelta;
use transcriptor_core::tools::ToolFormatter;
use transcriptor_core::{Attachment, Config, Session, ToolStatus};

#[derive(Parser)]
#[command(name = "transcriptor")]
#[command(about = "Replay and stream assistant session transcripts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rebuild a finished session and print its transcript
    Replay {
        /// Session id (file stem of the recorded log)
        session: String,

        /// Directory holding recorded sessions (defaults to the configured one)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Print the transcript as JSON
        #[arg(long)]
        json: bool,
    },

    /// Feed a recorded log through the live controller, printing every UI update
    Stream {
        /// Path to a JSONL or JSON array event log
        log: PathBuf,

        /// Delay between events in milliseconds
        #[arg(long, default_value = "0")]
        delay_ms: u64,

        /// Print one JSON object per UI update
        #[arg(long)]
        json: bool,
    },

    /// Show the label and detail for one tool call
    Describe {
        /// Tool name as the backend reports it
        tool: String,

        /// Tool arguments as a JSON object
        #[arg(long)]
        args: Option<String>,

        /// Result (or error) text of the call
        #[arg(long)]
        result: Option<String>,

        /// pending, succeeded or failed
        #[arg(long, default_value = "succeeded")]
        status: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard = transcriptor_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    tracing::info!("transcriptor starting");

    match cli.command {
        Command::Replay { session, dir, json } => replay(&config, &session, dir, json),
        Command::Stream {
            log,
            delay_ms,
            json,
        } => stream(&config, &log, delay_ms, json).await,
        Command::Describe {
            tool,
            args,
            result,
            status,
        } => describe(&config, &tool, args.as_deref(), result.as_deref(), &status),
    }
}

fn replay(config: &Config, session_id: &str, dir: Option<PathBuf>, json: bool) -> Result<()> {
    let root = dir.unwrap_or_else(|| config.sessions_dir());
    tracing::info!(session_id, root = %root.display(), "Replaying session");

    let mut session = Session::from_config(FileBackend::new(&root), config);
    let mut deltas: Vec<UiDelta> = Vec::new();
    let transcript = session
        .resume(session_id, &mut deltas)
        .with_context(|| format!("failed to resume session {} from {}", session_id, root.display()))?;

    if json {
        let out = serde_json::to_string_pretty(&transcript).context("failed to encode transcript")?;
        println!("{}", out);
    } else {
        print!("{}", render::transcript_text(&transcript));
    }
    Ok(())
}

/// A prompt and the events the backend produced for it.
struct RecordedTurn {
    prompt: Option<(String, Vec<Attachment>)>,
    events: Vec<RawEvent>,
}

/// Split a recorded log at each `user.message`.
fn split_turns(events: Vec<RawEvent>) -> Vec<RecordedTurn> {
    let mut turns = vec![RecordedTurn {
        prompt: None,
        events: Vec::new(),
    }];
    for raw in events {
        if let Event::UserMessage { text } = classify(&raw) {
            turns.push(RecordedTurn {
                prompt: Some((text, attachments(&raw))),
                events: Vec::new(),
            });
        } else if let Some(turn) = turns.last_mut() {
            turn.events.push(raw);
        }
    }
    turns
}

fn attachments(raw: &RawEvent) -> Vec<Attachment> {
    raw.data
        .get("attachments")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let path = item.get("path")?.as_str()?;
                    let mut attachment = Attachment::new(path);
                    attachment.display_name = item
                        .get("displayName")
                        .and_then(|v| v.as_str())
                        .map(str::to_string);
                    Some(attachment)
                })
                .collect()
        })
        .unwrap_or_default()
}

async fn stream(config: &Config, log_path: &Path, delay_ms: u64, json: bool) -> Result<()> {
    let log = load_log(log_path)
        .with_context(|| format!("failed to load event log {}", log_path.display()))?;
    if !log.warnings.is_empty() {
        eprintln!("Skipped {} malformed line(s)", log.warnings.len());
    }

    let root = log_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let mut session = Session::from_config(FileBackend::new(root), config);
    let mut sink = ConsoleSink::new(json);

    for turn in split_turns(log.events) {
        if let Some((prompt, attachments)) = turn.prompt {
            if session.controller().is_streaming() {
                tracing::warn!("Previous reply never finished; discarding it");
                session.controller_mut().reset();
            }
            session
                .send(&prompt, &attachments, &mut sink)
                .context("failed to send prompt")?;
        }

        let (tx, mut rx) = mpsc::channel(32);
        let events = turn.events;
        let producer = tokio::spawn(async move {
            for raw in events {
                if delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                if tx.send(raw).await.is_err() {
                    break;
                }
            }
        });

        session.pump(&mut rx, &mut sink).await;
        producer.await.context("event producer failed")?;
    }

    tracing::info!(
        updates = sink.emitted(),
        prompts = session.backend().sent().len(),
        "Stream finished"
    );
    Ok(())
}

fn describe(
    config: &Config,
    tool: &str,
    args: Option<&str>,
    result: Option<&str>,
    status: &str,
) -> Result<()> {
    let arguments: serde_json::Value = match args {
        Some(text) => serde_json::from_str(text).context("--args must be valid JSON")?,
        None => serde_json::Value::Null,
    };
    let status: ToolStatus = status.parse().map_err(|e: String| anyhow!(e))?;

    let formatter = ToolFormatter::new(config.display.truncate_chars);
    let display = formatter.describe(tool, status, &arguments, result);

    println!("{}", display.label);
    if let Some(detail) = display.detail {
        println!("{}", detail);
    }
    Ok(())
}
