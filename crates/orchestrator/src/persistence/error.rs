//! Persistence error types.
//!
//! SurrealDB reports failures as text; [`from_surrealdb_error`] sorts them
//! into the few cases the actors treat differently. Connection failures and
//! timeouts are transient and logged as retryable when a flush fails.

use std::fmt;

use thiserror::Error;

/// Errors that can occur during persistence operations.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Failed to connect to the database
    #[error("connection failed: {reason}")]
    ConnectionFailed { reason: String },

    /// Query execution failed
    #[error("query failed: {reason}")]
    QueryFailed { reason: String },

    /// A CREATE hit an existing record, e.g. a claim taken concurrently
    #[error("record already exists: {reason}")]
    AlreadyExists { reason: String },

    /// Stored state could not be encoded or decoded
    #[error("serialization error: {reason}")]
    SerializationError { reason: String },

    /// Timeout waiting for operation
    #[error("operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

impl PersistenceError {
    /// Create a connection failed error.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            reason: reason.into(),
        }
    }

    /// Create a query failed error.
    pub fn query_failed(reason: impl Into<String>) -> Self {
        Self::QueryFailed {
            reason: reason.into(),
        }
    }

    /// Create an already exists error.
    pub fn already_exists(reason: impl Into<String>) -> Self {
        Self::AlreadyExists {
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization_error(reason: impl Into<String>) -> Self {
        Self::SerializationError {
            reason: reason.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Check if error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. } | Self::Timeout { .. }
        )
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_error(err.to_string())
    }
}

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Helper to convert SurrealDB errors to PersistenceError.
pub fn from_surrealdb_error(err: impl fmt::Display) -> PersistenceError {
    let msg = err.to_string();

    if msg.contains("timeout") || msg.contains("Timeout") {
        PersistenceError::timeout(0)
    } else if msg.contains("connection") || msg.contains("Connection") || msg.contains("connect") {
        PersistenceError::connection_failed(msg)
    } else if msg.contains("already exists") || msg.contains("duplicate") {
        PersistenceError::already_exists(msg)
    } else {
        PersistenceError::query_failed(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_failed_is_retryable() {
        let err = PersistenceError::connection_failed("host unreachable");
        assert!(err.is_retryable());
    }

    #[test]
    fn test_existing_claim_is_not_retryable() {
        let err = from_surrealdb_error("Database record `active_conversation:U1` already exists");
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "record already exists: Database record `active_conversation:U1` already exists"
        );
    }

    #[test]
    fn test_bad_json_becomes_serialization_error() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        if let Err(e) = bad {
            let err: PersistenceError = e.into();
            assert!(matches!(err, PersistenceError::SerializationError { .. }));
        }
    }

    #[test]
    fn test_from_surrealdb_error_categories() {
        assert!(matches!(
            from_surrealdb_error("operation timeout after 30s"),
            PersistenceError::Timeout { .. }
        ));
        assert!(matches!(
            from_surrealdb_error("Database record `active_conversation:U1` already exists"),
            PersistenceError::AlreadyExists { .. }
        ));
        assert!(matches!(
            from_surrealdb_error("some random error"),
            PersistenceError::QueryFailed { .. }
        ));
    }
}
