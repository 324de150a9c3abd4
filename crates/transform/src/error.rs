//! Error taxonomy of the transformation engine.
//!
//! [`ValidationError`] is returned at build time and leaves the engine
//! untouched. [`VisitError`]s are collected during execution, one per failed
//! match, and never stop the run. Broken internal invariants (unknown ids,
//! cycles) are programmer errors and panic instead.

use crate::field::FieldId;
use crate::node::{NodeId, NodeKind};
use docflow_keypath::{KeyPath, PathError};
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, TransformError>;

/// A node or field request that violates the schema contracts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Field path must not be empty")]
    EmptyPath,

    #[error("Field path '{0}' starts with an array index")]
    LeadingIndex(KeyPath),

    #[error("Field {0} is listed more than once")]
    DuplicateInput(FieldId),

    #[error("Identity nodes are created by the engine and cannot be added")]
    IdentityNode,

    #[error("{kind} takes {expected} input field(s), got {found}")]
    InputCount {
        kind: NodeKind,
        expected: &'static str,
        found: usize,
    },

    #[error("Field {0} is disabled")]
    FieldDisabled(FieldId),

    #[error("{0} must declare at least one new field")]
    MissingNewFields(NodeKind),

    #[error("New field '{path}' is not local to input '{input}'")]
    NonLocalOutput { path: KeyPath, input: KeyPath },

    #[error("Input fields '{left}' and '{right}' are nested in incompatible arrays")]
    IncompatibleNesting { left: KeyPath, right: KeyPath },

    #[error("Input '{input}' and output '{output}' vary over more than one independent array")]
    IndependentDimensions { input: KeyPath, output: KeyPath },

    #[error("Path '{path}' is already used by field {field}")]
    PathTaken { path: KeyPath, field: FieldId },

    #[error("Invalid {kind} parameters: {reason}")]
    InvalidMetadata { kind: NodeKind, reason: String },
}

impl ValidationError {
    pub fn invalid_metadata(kind: NodeKind, reason: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            kind,
            reason: reason.into(),
        }
    }
}

/// What went wrong with one concrete match
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VisitErrorKind {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("no location for '{to}' local to '{from}'")]
    Locality { from: KeyPath, to: KeyPath },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("result is not a finite number")]
    NonFiniteNumber,

    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl VisitErrorKind {
    pub fn type_mismatch(expected: &'static str, found: &serde_json::Value) -> Self {
        Self::TypeMismatch {
            expected,
            found: docflow_keypath::value_kind(found),
        }
    }
}

/// Execution-time failure of one node on one concrete location
#[derive(Error, Debug, Clone, PartialEq)]
#[error("node {node} on field {field} at '{location}': {kind}")]
pub struct VisitError {
    pub node: NodeId,
    pub field: FieldId,
    pub location: KeyPath,
    pub kind: VisitErrorKind,
}

/// A persisted engine that cannot be reconstructed
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Failed to decode snapshot: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Unsupported snapshot version {0}")]
    Version(u32),

    #[error("Inconsistent snapshot: {0}")]
    Inconsistent(String),
}

impl RestoreError {
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::Inconsistent(msg.into())
    }
}

/// Umbrella error for callers that want a single type
#[derive(Error, Debug)]
pub enum TransformError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Restore(#[from] RestoreError),

    #[error("Transformation produced {} error(s)", .errors.len())]
    Visit { errors: Vec<VisitError> },
}
