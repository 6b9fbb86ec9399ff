//! Orchestrator error types.

use thiserror::Error;

use crate::actors::ActorError;
use crate::domain::MeetingId;
use crate::integrations::IntegrationError;

/// Failures of meeting-level operations.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Meeting not found: {0}")]
    MeetingNotFound(MeetingId),

    #[error("Meeting already exists: {0}")]
    MeetingAlreadyExists(MeetingId),

    #[error(transparent)]
    InvalidMeeting(#[from] standup_core::Error),

    /// No reminder instant exists for the meeting's schedule.
    #[error("Schedule error: {0}")]
    Schedule(String),

    #[error(transparent)]
    Actor(#[from] ActorError),

    #[error(transparent)]
    Integration(#[from] IntegrationError),
}

impl OrchestratorError {
    pub fn meeting_not_found(id: &MeetingId) -> Self {
        Self::MeetingNotFound(id.clone())
    }

    pub fn meeting_already_exists(id: &MeetingId) -> Self {
        Self::MeetingAlreadyExists(id.clone())
    }

    pub fn schedule(msg: impl Into<String>) -> Self {
        Self::Schedule(msg.into())
    }

    /// Whether the caller sent something unusable (as opposed to a
    /// downstream failure).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidMeeting(_)
                | Self::MeetingAlreadyExists(_)
                | Self::Schedule(_)
                | Self::Actor(ActorError::MalformedMessage(_) | ActorError::UnknownCommand(_))
        )
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_invalid_meeting_when_classified_then_client_error() {
        let err: OrchestratorError = standup_core::Error::invalid_meeting("no questions").into();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("no questions"));
    }

    #[test]
    fn given_missing_meeting_when_classified_then_not_client_error() {
        let err = OrchestratorError::meeting_not_found(&MeetingId::new("m9"));
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "Meeting not found: m9");
    }

    #[test]
    fn given_existing_meeting_when_classified_then_client_error() {
        let err = OrchestratorError::meeting_already_exists(&MeetingId::new("m1"));
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Meeting already exists: m1");
    }
}
