//! Error types for SQLite storage

use entwine_core::{Error, Operation};
use rusqlite::ErrorCode;
use thiserror::Error;

/// SQLite storage error type
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Schema materialization error
    #[error("Schema error: {0}")]
    Schema(String),

    /// A stored value could not be read back as its declared type
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// The call's context was cancelled while it held the connection
    #[error("Interrupted")]
    Interrupted,

    /// Engine-level error raised while the connection was held
    #[error(transparent)]
    Engine(Error),

    /// Underlying rusqlite error
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

/// Result type for SQLite operations
pub type SqliteResult<T> = Result<T, SqliteError>;

impl From<Error> for SqliteError {
    fn from(err: Error) -> Self {
        Self::Engine(err)
    }
}

impl SqliteError {
    /// Convert into the engine error, attaching the operation and entity type
    pub fn into_error(self, op: Operation, entity: &str) -> Error {
        let entity = entity.to_string();
        match self {
            Self::Engine(err) => err,
            Self::Interrupted => Error::Cancelled { op, entity },
            Self::Rusqlite(err) => match err.sqlite_error_code() {
                Some(ErrorCode::ConstraintViolation) => Error::ConstraintViolation {
                    op,
                    entity,
                    message: err.to_string(),
                },
                Some(ErrorCode::OperationInterrupted) => Error::Cancelled { op, entity },
                _ => Error::Store {
                    op,
                    entity,
                    message: err.to_string(),
                },
            },
            other => Error::Store {
                op,
                entity,
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_constraint_codes_map_to_constraint_violation() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err();

        let err = SqliteError::from(err).into_error(Operation::Create, "T");
        assert!(err.is_constraint());
        assert!(err.to_string().starts_with("create T: constraint violation"));
    }

    #[test]
    fn test_other_errors_map_to_store() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn.execute("SELECT * FROM missing", []).unwrap_err();

        let err = SqliteError::from(err).into_error(Operation::Query, "User");
        assert!(matches!(err, Error::Store { op: Operation::Query, .. }));
    }

    #[test]
    fn test_engine_errors_pass_through() {
        let err = SqliteError::from(Error::NotFound {
            entity: "User".into(),
        })
        .into_error(Operation::Update, "User");
        assert!(err.is_not_found());

        let err = SqliteError::Interrupted.into_error(Operation::Delete, "Car");
        assert!(err.is_cancelled());
    }
}
