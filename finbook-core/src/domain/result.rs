//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// Every failure the services can produce maps onto one of these
/// variants. The server crate translates them to HTTP statuses:
/// Validation -> 400, NotFound -> 404, Conflict -> 409, rest -> 500.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        let msg = e.to_string();
        let lower = msg.to_lowercase();
        // DuckDB surfaces constraint violations as generic errors; classify
        // by message so callers see Conflict instead of a bare Database error.
        if lower.contains("unique constraint")
            || lower.contains("duplicate key")
            || lower.contains("primary key")
        {
            Self::Conflict(msg)
        } else {
            Self::Database(msg)
        }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;
