//! Error types for the ledger layer.

use thiserror::Error;

/// Ledger operation result type.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Ledger errors.
///
/// Every variant is fatal for a pipeline run: a skipped ledger write means a
/// missed notification, so callers halt instead of continuing.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// SQLx error (connection, query, etc.)
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// IO error (file system operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Write rejected because it would break a ledger invariant
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Injected or backend-specific failure without an underlying sqlx error
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid state error.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }
}
