//! Error taxonomy shared by every rule in the engine.

use std::fmt;

use rusqlite::{Error as SqlError, ErrorCode};
use thiserror::Error;

/// Result alias used by the persistence and rule functions.
pub type Result<T> = std::result::Result<T, LibraryError>;

#[derive(Debug, Error)]
pub enum LibraryError {
    /// A referenced book, card or borrow does not exist.
    #[error("{0}")]
    NotFound(String),
    /// A uniqueness rule would be broken.
    #[error("{0}")]
    DuplicateEntity(String),
    /// Blocked by an outstanding borrow.
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    OutOfStock(String),
    /// The store itself failed.
    #[error("storage failure: {0}")]
    Storage(#[from] SqlError),
    /// Persisted data contradicts the schema's invariants.
    #[error("inconsistent storage state: {0}")]
    Inconsistent(String),
}

/// Flat classification carried in the result envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    DuplicateEntity,
    Conflict,
    InvalidArgument,
    OutOfStock,
    StorageFailure,
}

impl LibraryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LibraryError::NotFound(_) => ErrorKind::NotFound,
            LibraryError::DuplicateEntity(_) => ErrorKind::DuplicateEntity,
            LibraryError::Conflict(_) => ErrorKind::Conflict,
            LibraryError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            LibraryError::OutOfStock(_) => ErrorKind::OutOfStock,
            LibraryError::Storage(_) | LibraryError::Inconsistent(_) => ErrorKind::StorageFailure,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::DuplicateEntity => "DuplicateEntity",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::OutOfStock => "OutOfStock",
            ErrorKind::StorageFailure => "StorageFailure",
        };
        f.write_str(name)
    }
}

/// Turn a SQLite constraint violation into `DuplicateEntity` with the given
/// message. Anything else stays a storage failure.
pub(crate) fn map_unique_constraint(
    err: SqlError,
    message: impl FnOnce() -> String,
) -> LibraryError {
    map_constraint_violation(err, || LibraryError::DuplicateEntity(message()))
}

/// Replace a SQLite constraint violation with the domain error built by
/// `domain`. Other SQLite errors pass through as storage failures so broken
/// connections are never hidden behind a friendly message.
pub(crate) fn map_constraint_violation(
    err: SqlError,
    domain: impl FnOnce() -> LibraryError,
) -> LibraryError {
    if matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    ) {
        domain()
    } else {
        err.into()
    }
}
