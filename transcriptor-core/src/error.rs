//! Error types for transcriptor-core

use thiserror::Error;

/// Main error type for the transcriptor-core library
///
/// Protocol noise from the backend (unknown event kinds, completions without a
/// start, deltas after idle) is never reported through this type; it is logged
/// and dropped where it is observed.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Session not found
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Backend transport error
    #[error("backend error: {0}")]
    Backend(String),

    /// A message is already streaming for this session
    #[error("a generation is already in progress for this session")]
    GenerationInProgress,
}

/// Result type alias for transcriptor-core
pub type Result<T> = std::result::Result<T, Error>;
