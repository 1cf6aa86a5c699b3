use std::time::Duration;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// A row that a write path depended on does not exist.
    ///
    /// Read paths never return this, they return [`None`] instead.
    #[error("Row not found")]
    NotFound,
    #[error("Constraint violation ({kind:?}) on `{constraint}`: {message}")]
    ConstraintViolation {
        kind: ConstraintKind,
        constraint: String,
        message: String,
    },
    #[error("Operation was cancelled")]
    Cancelled,
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    #[error("Database is not reachable: {0}")]
    Transport(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// No panel access control rule matched the given roles
    #[error("No access control rule matched")]
    NoRuleMatched,
    #[error(transparent)]
    Query(DieselError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    NotNull,
    Check,
}

impl DbError {
    /// Whether this error was raised by a unique constraint, e.g. two tickets racing for the
    /// same id. Callers that allocate ids use this to decide whether to retry.
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DbError::ConstraintViolation {
                kind: ConstraintKind::Unique,
                ..
            }
        )
    }

    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            DbError::ConstraintViolation {
                kind: ConstraintKind::ForeignKey,
                ..
            }
        )
    }
}

impl From<DieselError> for DbError {
    fn from(e: DieselError) -> Self {
        match e {
            DieselError::NotFound => DbError::NotFound,
            DieselError::DatabaseError(kind, info) => {
                let kind = match kind {
                    DatabaseErrorKind::UniqueViolation => ConstraintKind::Unique,
                    DatabaseErrorKind::ForeignKeyViolation => ConstraintKind::ForeignKey,
                    DatabaseErrorKind::NotNullViolation => ConstraintKind::NotNull,
                    DatabaseErrorKind::CheckViolation => ConstraintKind::Check,
                    DatabaseErrorKind::ClosedConnection => {
                        return DbError::Transport(info.message().to_string())
                    }
                    other => return DbError::Query(DieselError::DatabaseError(other, info)),
                };
                DbError::ConstraintViolation {
                    kind,
                    constraint: info.constraint_name().unwrap_or_default().to_string(),
                    message: info.message().to_string(),
                }
            }
            DieselError::BrokenTransactionManager => {
                DbError::Transport(DieselError::BrokenTransactionManager.to_string())
            }
            other => DbError::Query(other),
        }
    }
}

impl From<diesel::ConnectionError> for DbError {
    fn from(e: diesel::ConnectionError) -> Self {
        DbError::Transport(e.to_string())
    }
}

impl From<diesel_async::pooled_connection::deadpool::PoolError> for DbError {
    fn from(e: diesel_async::pooled_connection::deadpool::PoolError) -> Self {
        DbError::Transport(e.to_string())
    }
}

impl From<uuid::Error> for DbError {
    fn from(e: uuid::Error) -> Self {
        DbError::InvalidInput(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_mapped_to_its_own_variant() {
        assert!(matches!(DbError::from(DieselError::NotFound), DbError::NotFound));
    }

    #[test]
    fn rollback_is_a_query_error() {
        let err = DbError::from(DieselError::RollbackTransaction);
        assert!(matches!(err, DbError::Query(_)));
        assert!(!err.is_unique_violation());
    }

    #[test]
    fn invalid_uuid_is_invalid_input() {
        let err: DbError = uuid::Uuid::parse_str("not-a-uuid").unwrap_err().into();
        assert!(matches!(err, DbError::InvalidInput(_)));
    }
}
