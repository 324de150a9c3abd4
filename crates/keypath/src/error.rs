//! Error types for key path parsing and document addressing

use crate::keypath::KeyPath;
use thiserror::Error;

/// Result type alias for key path operations
pub type Result<T> = std::result::Result<T, PathError>;

/// Errors raised while parsing a key path or writing through one
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Invalid key path '{input}': {reason}")]
    Parse { input: String, reason: String },

    #[error("Cannot write through a wildcard: {0}")]
    WildcardInLocation(KeyPath),

    #[error("Expected {expected} at '{at}', found {found}")]
    Shape {
        at: KeyPath,
        expected: &'static str,
        found: &'static str,
    },
}

impl PathError {
    /// Create a new parse error
    pub fn parse(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.into(),
            reason: reason.into(),
        }
    }
}
