//! Identifier validation rules and utilities

use std::fmt;

/// Maximum length for a worker identifier.
///
/// Worker ids end up as enum values in the model's tool schema, so they stay short.
pub const MAX_ID_LENGTH: usize = 64;

/// Error type for identifier validation failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdValidationError {
    /// The identifier string is empty
    Empty,
    /// The identifier has leading or trailing whitespace
    LeadingTrailingWhitespace,
    /// The identifier contains invalid characters
    InvalidCharacters,
    /// The identifier exceeds the maximum length
    TooLong { length: usize, max: usize },
}

impl fmt::Display for IdValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Identifier cannot be empty"),
            Self::LeadingTrailingWhitespace => {
                write!(f, "Identifier cannot have leading or trailing whitespace")
            }
            Self::InvalidCharacters => write!(
                f,
                "Identifier can only contain ASCII alphanumeric characters, hyphens and underscores"
            ),
            Self::TooLong { length, max } => {
                write!(f, "Identifier too long ({} chars, max {})", length, max)
            }
        }
    }
}

impl std::error::Error for IdValidationError {}

/// Validator for identifier strings
pub struct IdValidator;

impl IdValidator {
    /// Validate an identifier string.
    ///
    /// # Validation Rules
    ///
    /// - Non-empty
    /// - Maximum 64 characters
    /// - No leading or trailing whitespace
    /// - Only ASCII alphanumeric characters, hyphens (`-`) and underscores (`_`)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use foreman_core::identifiers::IdValidator;
    ///
    /// assert!(IdValidator::validate("coder").is_ok());
    /// assert!(IdValidator::validate("test_runner-2").is_ok());
    ///
    /// assert!(IdValidator::validate("").is_err());
    /// assert!(IdValidator::validate(" coder").is_err());
    /// assert!(IdValidator::validate("coder/reviewer").is_err());
    /// ```
    pub fn validate(id: &str) -> Result<&str, IdValidationError> {
        if id.is_empty() {
            return Err(IdValidationError::Empty);
        }

        if id != id.trim() {
            return Err(IdValidationError::LeadingTrailingWhitespace);
        }

        if id.len() > MAX_ID_LENGTH {
            return Err(IdValidationError::TooLong {
                length: id.len(),
                max: MAX_ID_LENGTH,
            });
        }

        if !id.chars().all(Self::is_valid_char) {
            return Err(IdValidationError::InvalidCharacters);
        }

        Ok(id)
    }

    /// Check if a character is valid in an identifier
    pub fn is_valid_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '-' || c == '_'
    }
}
