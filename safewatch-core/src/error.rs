//! Engine error types with caller-facing messages

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the verification and trust engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed input, reported with the offending field
    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    /// Unknown incident or user
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Vote rejected (self vote)
    #[error("vote rejected: {reason}")]
    InvalidVote { reason: String },

    /// Incident is in the terminal `removed` state
    #[error("incident {id} has been removed by a moderator")]
    AlreadyRemoved { id: String },

    /// Report screened out as probable spam
    #[error("report rejected as spam: {reason}")]
    SpamDetected { reason: String },

    /// Configuration failed to load or validate
    #[error("configuration error: {0}")]
    Config(String),

    /// Ledger or audit file could not be read or written
    #[error("storage error at {path}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Ledger contents could not be (de)serialized
    #[error("failed to (de)serialize ledger data")]
    Serialization {
        #[source]
        source: serde_json::Error,
    },
}

impl EngineError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        EngineError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// True when the caller caused the failure (bad input, unknown ids,
    /// forbidden action) rather than the environment.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EngineError::Validation { .. }
                | EngineError::NotFound { .. }
                | EngineError::InvalidVote { .. }
                | EngineError::AlreadyRemoved { .. }
                | EngineError::SpamDetected { .. }
        )
    }

    /// Log infrastructure failures at error level; rejections are routine.
    pub fn log_if_infrastructure(&self) {
        if !self.is_rejection() {
            tracing::error!(target: "storage", "ENGINE FAILURE: {}", self);
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(source: serde_json::Error) -> Self {
        EngineError::Serialization { source }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
