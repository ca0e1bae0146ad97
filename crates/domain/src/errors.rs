//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for CalPilot
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CalPilotError {
    /// The request could not be mapped to a calendar intent.
    #[error("Could not determine what you want to do with your calendar")]
    ClassificationAmbiguous,

    /// Validation or the conflict check rejected the request.
    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    /// The channel to the tool executor broke (spawn failure, exit, EOF, timeout).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Access token could not be obtained or refreshed.
    #[error("Credential error: {0}")]
    Credential(String),

    /// A remote event had neither a parseable `dateTime` nor `date`.
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// A tool operation was attempted before the initialization handshake.
    #[error("Tool session is not initialized")]
    SessionNotReady,

    /// The peer answered with a JSON-RPC error or an unexpected payload.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The text-generation capability failed.
    #[error("Capability error: {0}")]
    Capability(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CalPilotError {
    /// Stable label used in structured logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ClassificationAmbiguous => "classification_ambiguous",
            Self::ValidationFailed(_) => "validation_failed",
            Self::Transport(_) => "transport",
            Self::Credential(_) => "credential",
            Self::MalformedEvent(_) => "malformed_event",
            Self::SessionNotReady => "session_not_ready",
            Self::Protocol(_) => "protocol",
            Self::Capability(_) => "capability",
            Self::Config(_) => "config",
            Self::Network(_) => "network",
            Self::InvalidInput(_) => "invalid_input",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result type alias for CalPilot operations
pub type Result<T> = std::result::Result<T, CalPilotError>;
