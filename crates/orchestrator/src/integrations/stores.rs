//! Store contracts consulted by the actors.
//!
//! The actors use these only for existence checks, the response audit log
//! and the active-conversation index. Business decisions never query them
//! beyond that.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::IntegrationResult;
use crate::domain::{Meeting, MeetingId, ParticipantId, ParticipantResponse, WorkLogIntegration};

/// Meeting CRUD plus per-participant integrations.
#[async_trait]
pub trait MeetingStore: Send + Sync + fmt::Debug {
    async fn exists(&self, id: &MeetingId) -> IntegrationResult<bool>;

    async fn get(&self, id: &MeetingId) -> IntegrationResult<Option<Meeting>>;

    /// Insert or replace.
    async fn save(&self, meeting: &Meeting) -> IntegrationResult<()>;

    async fn delete(&self, id: &MeetingId) -> IntegrationResult<()>;

    async fn work_log_integration(
        &self,
        meeting_id: &MeetingId,
        participant_id: &ParticipantId,
    ) -> IntegrationResult<Option<WorkLogIntegration>>;

    async fn set_work_log_integration(
        &self,
        meeting_id: &MeetingId,
        participant_id: &ParticipantId,
        integration: WorkLogIntegration,
    ) -> IntegrationResult<()>;
}

/// Append-only history of every response record.
#[async_trait]
pub trait ResponseLog: Send + Sync + fmt::Debug {
    async fn append(
        &self,
        meeting_id: &MeetingId,
        response: &ParticipantResponse,
        recorded_at: DateTime<Utc>,
    ) -> IntegrationResult<()>;
}

/// Result of trying to mark a participant as in conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// The claim is held by the caller (fresh or already held).
    Claimed,
    /// Another conversation holds the claim.
    Busy { holder: String },
}

/// `participant -> conversation actor name` for conversations in flight.
#[async_trait]
pub trait ActiveConversationIndex: Send + Sync + fmt::Debug {
    /// The conversation currently holding the participant, if any.
    async fn get(&self, participant_id: &ParticipantId) -> IntegrationResult<Option<String>>;

    /// Atomically claim the participant for `conversation`.
    async fn try_claim(
        &self,
        participant_id: &ParticipantId,
        conversation: &str,
    ) -> IntegrationResult<ClaimOutcome>;

    /// Drop the claim if `conversation` holds it.
    async fn release(
        &self,
        participant_id: &ParticipantId,
        conversation: &str,
    ) -> IntegrationResult<()>;
}
