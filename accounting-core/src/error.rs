//! Error types for the accounting core

use thiserror::Error;

/// Result type for accounting operations
pub type Result<T> = std::result::Result<T, Error>;

/// Accounting errors
#[derive(Error, Debug)]
pub enum Error {
    /// Business-rule validation failure (bad input, duplicate code, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payment would drive a treasury below its floor
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),

    /// Illegal state transition
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Optimistic-lock loss, actor mailbox closed, etc. Retryable.
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the caller may re-submit the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ConcurrencyConflict(_))
    }

    /// Stable snake_case label, used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::NotFound(_) => "not_found",
            Error::InsufficientFunds(_) => "insufficient_funds",
            Error::InvalidState(_) => "invalid_state",
            Error::ConcurrencyConflict(_) => "concurrency_conflict",
            Error::Storage(_) => "storage",
            Error::Serialization(_) => "serialization",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
        }
    }
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(Error::ConcurrencyConflict("lost race".to_string()).is_retryable());
        assert!(!Error::Validation("bad amount".to_string()).is_retryable());
        assert!(!Error::InvalidState("already confirmed".to_string()).is_retryable());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(Error::Validation("x".into()).kind(), "validation");
        assert_eq!(Error::InsufficientFunds("x".into()).kind(), "insufficient_funds");
        assert_eq!(Error::ConcurrencyConflict("x".into()).kind(), "concurrency_conflict");
    }

    #[test]
    fn test_display_includes_detail() {
        let err = Error::InsufficientFunds("treasury T below floor".to_string());
        assert!(err.to_string().contains("treasury T"));
    }
}
