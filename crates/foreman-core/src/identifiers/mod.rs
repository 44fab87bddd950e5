//! Validated identifier types.
//!
//! Worker ids travel through the model's tool schema and back through its tool calls, so every
//! id is parsed once at the edge and carried as a [`WorkerId`] afterwards.
//!
//! ```rust
//! use foreman_core::identifiers::WorkerId;
//!
//! let id = WorkerId::parse("coder").unwrap();
//! assert_eq!(id.as_str(), "coder");
//!
//! assert!(WorkerId::parse("").is_err());
//! assert!(WorkerId::parse("code review").is_err());
//! ```

mod validation;

pub use validation::{IdValidationError, IdValidator, MAX_ID_LENGTH};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Unique identifier for a registered worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkerId(String);

impl WorkerId {
    /// Parse and validate a worker ID from a string
    pub fn parse(id: impl AsRef<str>) -> Result<Self, CoreError> {
        let id = id.as_ref();
        IdValidator::validate(id)
            .map(|s| Self(s.to_string()))
            .map_err(|source| CoreError::InvalidId {
                id: id.to_string(),
                source,
            })
    }

    /// Get the worker ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for WorkerId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<WorkerId> for String {
    fn from(id: WorkerId) -> Self {
        id.0
    }
}

impl TryFrom<String> for WorkerId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl AsRef<str> for WorkerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for WorkerId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for WorkerId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let id: WorkerId = "coder".parse().unwrap();
        assert_eq!(id.to_string(), "coder");
        assert_eq!(id, "coder");
    }

    #[test]
    fn serde_validates_on_deserialize() {
        let ok: WorkerId = serde_json::from_str("\"reviewer\"").unwrap();
        assert_eq!(ok.as_str(), "reviewer");

        let bad: Result<WorkerId, _> = serde_json::from_str("\"not valid\"");
        assert!(bad.is_err());
    }

    #[test]
    fn invalid_id_reports_offending_input() {
        let err = WorkerId::parse("a/b").unwrap_err();
        match err {
            CoreError::InvalidId { id, source } => {
                assert_eq!(id, "a/b");
                assert_eq!(source, IdValidationError::InvalidCharacters);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
