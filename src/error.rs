//! Error types for Notewise.

use thiserror::Error;

/// Why a transcription attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Non-success status, undecodable body, or a backend that stayed cold after the retry.
    BackendError,
    /// The body was valid but matched neither a transcript nor a known error shape.
    UnrecognizedResponse,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::BackendError => write!(f, "backend error"),
            FailureKind::UnrecognizedResponse => write!(f, "unrecognized response"),
        }
    }
}

/// A terminal transcription failure with the raw backend diagnostic preserved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {detail}")]
pub struct TranscriptionError {
    pub kind: FailureKind,
    pub detail: String,
}

impl TranscriptionError {
    pub fn backend(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::BackendError,
            detail: detail.into(),
        }
    }

    pub fn unrecognized(detail: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::UnrecognizedResponse,
            detail: detail.into(),
        }
    }
}

/// The summarization backend failed (quota, auth, malformed request, empty reply).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct SummarizationError(pub String);

/// Library-level error type for Notewise operations.
#[derive(Error, Debug)]
pub enum NotewiseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Audio source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("Summarization failed: {0}")]
    Summarization(#[from] SummarizationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Notewise operations.
pub type Result<T> = std::result::Result<T, NotewiseError>;
