//! Custom error types for the common library
//!
//! This module defines the error taxonomy surfaced by the durable store. The
//! services map these onto their own boundary errors.

use sqlx::Error as SqlxError;
use thiserror::Error;

/// Custom error type for database operations
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred during database migration
    #[error("Database migration error: {0}")]
    Migration(String),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),

    /// The addressed row does not exist, or a version-checked update matched nothing
    #[error("Resource not found")]
    NotFound,

    /// A unique constraint rejected the write
    #[error("Duplicate key violates unique constraint {0}")]
    UniqueViolation(String),

    /// A foreign key constraint rejected the write
    #[error("Foreign key constraint {0} violated")]
    ForeignKeyViolation(String),
}

impl DatabaseError {
    /// Classify a query failure, pulling constraint violations out of the
    /// generic query bucket so callers can tell duplicates from outages.
    pub fn from_query(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => return DatabaseError::NotFound,
            SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) => {
                return DatabaseError::Connection(err);
            }
            _ => {}
        }

        if let Some(db_err) = err.as_database_error() {
            let constraint = db_err.constraint().unwrap_or_default().to_string();
            if db_err.is_unique_violation() {
                return DatabaseError::UniqueViolation(constraint);
            }
            if db_err.is_foreign_key_violation() {
                return DatabaseError::ForeignKeyViolation(constraint);
            }
        }

        DatabaseError::Query(err)
    }

    /// Whether the failure is a unique violation on the named constraint
    pub fn is_unique_violation_of(&self, constraint: &str) -> bool {
        matches!(self, DatabaseError::UniqueViolation(c) if c == constraint)
    }
}

impl From<SqlxError> for DatabaseError {
    fn from(err: SqlxError) -> Self {
        DatabaseError::from_query(err)
    }
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;
