//! Errors raised by external collaborators.

use thiserror::Error;

use crate::persistence::PersistenceError;

/// Failures of the chat platform, the issue tracker or the stores.
#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("chat platform error: {0}")]
    Chat(String),

    #[error("work log submission failed: {0}")]
    WorkLog(String),

    #[error("integration not configured: {0}")]
    NotConfigured(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Store(#[from] PersistenceError),
}

impl IntegrationError {
    /// Create a chat platform error.
    pub fn chat(reason: impl Into<String>) -> Self {
        Self::Chat(reason.into())
    }

    /// Create a work log error.
    pub fn work_log(reason: impl Into<String>) -> Self {
        Self::WorkLog(reason.into())
    }

    /// Create a not configured error.
    pub fn not_configured(what: impl Into<String>) -> Self {
        Self::NotConfigured(what.into())
    }
}

/// Result type for integration calls.
pub type IntegrationResult<T> = Result<T, IntegrationError>;
