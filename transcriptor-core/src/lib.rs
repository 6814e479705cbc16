//! # transcriptor-core
//!
//! Client-side session engine for a tool-using AI assistant backend.
//!
//! This library provides:
//! - Event classification for the backend's flat event stream
//! - Tool call pairing and human-readable tool labels
//! - A live stream controller driving incremental UI updates
//! - A transcript reconstructor for resuming finished sessions
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Both engines read the same events and write to the same [`live::UiSink`]:
//! - **Live mode:** [`live::LiveController`] applies events one at a time as
//!   they arrive during a generation
//! - **Resume mode:** [`transcript::Reconstructor`] folds a complete log into
//!   a finished [`Transcript`] in one pass
//!
//! [`session::Session`] owns one backend and switches between the two.
//!
//! ## Example
//!
//! ```rust,no_run
//! use transcriptor_core::backend::FileBackend;
//! use transcriptor_core::live::UiDelta;
//! use transcriptor_core::session::Session;
//! use transcriptor_core::Config;
//!
//! let config = Config::load().expect("failed to load config");
//! let backend = FileBackend::new(config.sessions_dir());
//! let mut session = Session::from_config(backend, &config);
//!
//! let mut deltas: Vec<UiDelta> = Vec::new();
//! let transcript = session.resume("session-id", &mut deltas).expect("resume failed");
//! println!("{} messages", transcript.messages.len());
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, Result};
pub use session::Session;
pub use transcript::{reconstruct, Reconstructor};
pub use types::*;

// Public modules
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod live;
pub mod logging;
pub mod session;
pub mod tools;
pub mod transcript;
pub mod types;
