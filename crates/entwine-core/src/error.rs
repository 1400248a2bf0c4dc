//! Error types for entwine
//!
//! Every variant carries enough context (operation, entity type and, where it
//! applies, the field or edge) to diagnose a failure without re-running it.

use std::fmt;
use thiserror::Error;

/// Kind of engine operation an error was raised from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Connect,
    Materialize,
    Create,
    Update,
    Delete,
    Query,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connect => "connect",
            Self::Materialize => "materialize",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Query => "query",
        };
        f.write_str(s)
    }
}

/// Engine error taxonomy
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A type, field, edge or table name collides with an existing one
    #[error("schema conflict on {entity}: {name} is already defined")]
    SchemaConflict { entity: String, name: String },

    /// The schema is inconsistent or could not be materialized
    #[error("schema error on {entity}: {reason}")]
    Schema { entity: String, reason: String },

    #[error("unknown entity type {name}")]
    UnknownType { name: String },

    #[error("unknown field {entity}.{field}")]
    UnknownField { entity: String, field: String },

    #[error("unknown edge {entity}.{edge}")]
    UnknownEdge { entity: String, edge: String },

    #[error("type mismatch on {entity}.{field}: expected {expected}, got {found}")]
    TypeMismatch {
        entity: String,
        field: String,
        expected: String,
        found: String,
    },

    #[error("missing required field {entity}.{field}")]
    MissingField { entity: String, field: String },

    #[error("validator failed for {entity}.{field}: {reason}")]
    Validation {
        entity: String,
        field: String,
        reason: String,
    },

    /// More than one instance staged for an edge that holds at most one
    #[error("edge {entity}.{edge} holds at most one instance")]
    EdgeCardinality { entity: String, edge: String },

    #[error("invalid predicate on {entity}: {reason}")]
    InvalidPredicate { entity: String, reason: String },

    #[error("{op} {entity}: constraint violation: {message}")]
    ConstraintViolation {
        op: Operation,
        entity: String,
        message: String,
    },

    /// Connectivity, transaction or driver failure in the store
    #[error("{op} {entity}: store error: {message}")]
    Store {
        op: Operation,
        entity: String,
        message: String,
    },

    #[error("{entity} not found")]
    NotFound { entity: String },

    #[error("expected exactly one {entity}, found several")]
    MultipleResults { entity: String },

    #[error("{op} {entity}: cancelled")]
    Cancelled { op: Operation, entity: String },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn unknown_field(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self::UnknownField {
            entity: entity.into(),
            field: field.into(),
        }
    }

    pub fn unknown_edge(entity: impl Into<String>, edge: impl Into<String>) -> Self {
        Self::UnknownEdge {
            entity: entity.into(),
            edge: edge.into(),
        }
    }

    pub fn schema(entity: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            entity: entity.into(),
            reason: reason.into(),
        }
    }

    /// `only` found no rows, or an update/delete targeted a vanished row
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_multiple_results(&self) -> bool {
        matches!(self, Self::MultipleResults { .. })
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, Self::ConstraintViolation { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Errors raised by the caller's input rather than the store
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownField { .. }
                | Self::UnknownEdge { .. }
                | Self::UnknownType { .. }
                | Self::TypeMismatch { .. }
                | Self::MissingField { .. }
                | Self::Validation { .. }
                | Self::EdgeCardinality { .. }
                | Self::InvalidPredicate { .. }
        )
    }
}
