//! Core error types for stand-up operations.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use std::path::PathBuf;

use thiserror::Error;

/// Core error type for configuration and input parsing.
#[derive(Debug, Error)]
pub enum Error {
    // Configuration
    #[error("failed to read config '{path}': {reason}")]
    ConfigReadFailed { path: PathBuf, reason: String },

    #[error("TOML parse error: {reason}")]
    TomlParseFailed { reason: String },

    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // Domain input
    #[error("invalid time of day '{value}': {reason}")]
    InvalidTimeOfDay { value: String, reason: String },

    #[error("invalid meeting: {reason}")]
    InvalidMeeting { reason: String },
}

impl Error {
    /// Create a config read error.
    pub fn config_read_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ConfigReadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a TOML parse error.
    pub fn toml_parse_failed(reason: impl Into<String>) -> Self {
        Self::TomlParseFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid time-of-day error.
    pub fn invalid_time_of_day(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTimeOfDay {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid meeting error.
    pub fn invalid_meeting(reason: impl Into<String>) -> Self {
        Self::InvalidMeeting {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_read_failed_display() {
        let err = Error::config_read_failed("/etc/standup.toml", "permission denied");
        assert_eq!(
            err.to_string(),
            "failed to read config '/etc/standup.toml': permission denied"
        );
    }

    #[test]
    fn test_invalid_time_of_day_display() {
        let err = Error::invalid_time_of_day("25:00", "hour out of range");
        assert!(err.to_string().contains("25:00"));
        assert!(err.to_string().contains("hour out of range"));
    }

    #[test]
    fn test_invalid_meeting_display() {
        let err = Error::invalid_meeting("at least one question is required");
        assert_eq!(
            err.to_string(),
            "invalid meeting: at least one question is required"
        );
    }
}
