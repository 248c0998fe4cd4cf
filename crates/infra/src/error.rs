//! Storage error model.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` in exactly one place, [`map_sqlx_error`]:
//!
//! | SQLx Error | SQLite primary code | StoreError | Scenario |
//! |------------|---------------------|------------|----------|
//! | Database (busy) | `SQLITE_BUSY` (5) | `Contention` | Write lock not obtained within the busy timeout |
//! | Database (locked) | `SQLITE_LOCKED` (6) | `Contention` | Table lock held by another connection |
//! | Database (unique violation) | `SQLITE_CONSTRAINT` (19) | `Domain(Conflict)` | e.g. username already taken |
//! | Database (other) | Any other | `Storage` | Check/foreign-key failures, IO errors |
//! | PoolTimedOut | N/A | `Contention` | No pooled connection within the acquire timeout |
//! | Other | N/A | `Storage` | Decode errors, closed pool, etc. |

use thiserror::Error;

use depot_core::DomainError;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A business rule rejected the operation; nothing was written.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The write lock or a connection could not be obtained in time.
    #[error("storage contention in {0}")]
    Contention(String),

    /// The caller's deadline passed before the operation committed.
    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    #[error("storage failure: {0}")]
    Storage(String),
}

impl StoreError {
    /// Contention is the only failure a caller may retry verbatim.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Contention(_))
    }

    pub(crate) fn corrupt(what: impl core::fmt::Display) -> Self {
        StoreError::Storage(format!("corrupt row: {what}"))
    }
}

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Map SQLx errors to `StoreError`. See the module docs for the table.
pub fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.is_unique_violation() {
                return StoreError::Domain(DomainError::conflict(format!(
                    "{operation}: {}",
                    db_err.message()
                )));
            }
            // SQLite reports extended result codes; the low byte is the primary code.
            let primary = db_err
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                .map(|code| code & 0xff);
            match primary {
                Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) => StoreError::Contention(operation.to_string()),
                _ => StoreError::Storage(format!(
                    "database error in {operation}: {}",
                    db_err.message()
                )),
            }
        }
        sqlx::Error::PoolTimedOut => StoreError::Contention(operation.to_string()),
        other => StoreError::Storage(format!("sqlx error in {operation}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_contention_is_retryable() {
        assert!(StoreError::Contention("begin".into()).is_retryable());
        assert!(!StoreError::DeadlineExceeded.is_retryable());
        assert!(!StoreError::Storage("x".into()).is_retryable());
        assert!(!StoreError::Domain(DomainError::SelfTransfer).is_retryable());
    }

    #[test]
    fn pool_timeout_is_contention() {
        let err = map_sqlx_error("acquire", sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Contention(op) if op == "acquire"));
    }

    #[test]
    fn other_errors_are_storage_failures() {
        let err = map_sqlx_error("fetch", sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Storage(_)));
    }
}
