//! Error types for core configuration and identifier handling.

use thiserror::Error;

use crate::identifiers::IdValidationError;

/// Errors raised while building core values from untrusted input.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An identifier failed validation.
    #[error("Invalid identifier '{id}': {source}")]
    InvalidId {
        id: String,
        #[source]
        source: IdValidationError,
    },

    /// Configuration could not be read, parsed or validated.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        CoreError::Config {
            message: message.into(),
        }
    }

    /// Get the error code suitable for logging or reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::InvalidId { .. } => "INVALID_ID",
            CoreError::Config { .. } => "CONFIG_ERROR",
        }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
