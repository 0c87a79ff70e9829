//! Error types for the honeypot.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors surfaced by the conversation pipeline to its caller.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Malformed inbound message. Rejected before any session state changes.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Mutation attempted on a concluded or expired session.
    #[error("Session {session_id} is closed ({state})")]
    SessionClosed { session_id: String, state: String },
}

/// Failure of a single intelligence category. Never blocks other categories.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Extraction of {category} failed: {reason}")]
    FieldFailure { category: String, reason: String },
}

/// Report delivery failures. Logged and dropped, never retried.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Report sink {sink} transport error: {reason}")]
    Transport { sink: String, reason: String },

    #[error("Report sink {sink} returned status {status}")]
    Rejected { sink: String, status: u16 },

    #[error("Report sink {sink} timed out after {timeout:?}")]
    Timeout { sink: String, timeout: Duration },

    #[error("Report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for the honeypot.
pub type Result<T> = std::result::Result<T, Error>;
