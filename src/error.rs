//! Error types and Result aliases for MosaicMux

use std::path::PathBuf;

use crate::models::{CommandId, SessionId};

/// Result type alias for MosaicMux operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for MosaicMux
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // === Session errors ===
    /// Operation referenced a session that is not (or no longer) registered
    #[error("Session '{id}' not found")]
    SessionNotFound { id: SessionId },

    /// A session with this id was already registered (producer bug)
    #[error("Session '{id}' is already registered")]
    DuplicateSession { id: SessionId },

    /// An operation needed an active session but none is selected
    #[error("No active terminal session")]
    NoActiveSession,

    // === Command errors ===
    /// Operation referenced a command block that is not registered
    #[error("Command block '{id}' not found")]
    CommandNotFound { id: CommandId },

    /// The underlying command failed to run
    #[error("Execution of '{command}' failed: {reason}")]
    ExecutionFault { command: String, reason: String },

    /// The operation was cancelled by its caller
    #[error("Operation cancelled")]
    Cancelled,

    // === External service errors ===
    /// An external service call failed
    #[error("{service} unavailable: {reason}")]
    ServiceUnavailable { service: String, reason: String },

    /// The coordination context has shut down
    #[error("Coordinator is no longer running")]
    CoordinatorClosed,

    // === Configuration errors ===
    /// Failed to load configuration file
    #[error("Failed to load config from '{}': {reason}", path.display())]
    ConfigLoadFailed { path: PathBuf, reason: String },

    /// Failed to parse configuration
    #[error("Failed to parse {format} config: {reason}")]
    ConfigParseFailed { format: String, reason: String },

    /// Failed to serialize configuration
    #[error("Failed to serialize config as {format}: {reason}")]
    ConfigSerializationFailed { format: String, reason: String },

    /// Configuration validation failed
    #[error("Configuration validation failed for '{field}': {reason}")]
    ConfigValidationFailed { field: String, reason: String },

    /// An explicitly named configuration file does not exist
    #[error("Configuration file not found: '{}'", path.display())]
    ConfigNotFound { path: PathBuf },

    // === I/O and parsing errors ===
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Regex compilation errors
    #[error("Regex compilation error: {0}")]
    Regex(#[from] regex::Error),

    // === Generic fallback (use sparingly) ===
    /// Generic errors (for cases not yet categorized)
    #[error("Error: {0}")]
    Other(String),
}

impl Error {
    /// Whether the caller can treat this error as a no-op or user message
    ///
    /// Lookups of vanished sessions or commands are expected during normal
    /// operation; a duplicate registration is not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Error::DuplicateSession { .. } | Error::CoordinatorClosed
        )
    }

    /// Whether this error represents a cancellation rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Shorthand for a failed external service call
    pub fn service(service: &str, reason: impl std::fmt::Display) -> Self {
        Error::ServiceUnavailable {
            service: service.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
