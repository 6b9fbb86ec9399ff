//! SurrealDB-backed meeting store, response audit log and
//! active-conversation index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use super::client::SurrealStore;
use super::error::{PersistenceError, from_surrealdb_error};
use crate::domain::{
    Meeting, MeetingId, ParticipantId, ParticipantResponse, WorkLogIntegration,
    participant_actor_name,
};
use crate::integrations::{
    ActiveConversationIndex, ClaimOutcome, IntegrationResult, MeetingStore, ResponseLog,
};

const MEETING: &str = "meeting";
const WORK_LOG_INTEGRATION: &str = "work_log_integration";
const RESPONSE: &str = "standup_response";
const ACTIVE_CONVERSATION: &str = "active_conversation";

/// Meeting record; the meeting itself is kept as a JSON string.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MeetingRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    meeting: String,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IntegrationRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    meeting_id: String,
    participant_id: String,
    project_id: String,
    api_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ResponseRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    meeting_id: String,
    participant_id: String,
    response: String,
    recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClaimRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Thing>,
    conversation: String,
    claimed_at: DateTime<Utc>,
}

fn integration_key(meeting_id: &MeetingId, participant_id: &ParticipantId) -> String {
    participant_actor_name(meeting_id, participant_id)
}

#[async_trait]
impl MeetingStore for SurrealStore {
    async fn exists(&self, id: &MeetingId) -> IntegrationResult<bool> {
        Ok(MeetingStore::get(self, id).await?.is_some())
    }

    async fn get(&self, id: &MeetingId) -> IntegrationResult<Option<Meeting>> {
        let record: Option<MeetingRecord> = self
            .db()
            .select((MEETING, id.as_str().to_string()))
            .await
            .map_err(from_surrealdb_error)?;

        let meeting = record
            .map(|r| serde_json::from_str(&r.meeting))
            .transpose()
            .map_err(PersistenceError::from)?;
        Ok(meeting)
    }

    async fn save(&self, meeting: &Meeting) -> IntegrationResult<()> {
        let record = MeetingRecord {
            id: None,
            meeting: serde_json::to_string(meeting).map_err(PersistenceError::from)?,
            updated_at: Utc::now(),
        };

        let _: Option<MeetingRecord> = self
            .db()
            .upsert((MEETING, meeting.id.as_str().to_string()))
            .content(record)
            .await
            .map_err(from_surrealdb_error)?;

        Ok(())
    }

    async fn delete(&self, id: &MeetingId) -> IntegrationResult<()> {
        let _: Option<MeetingRecord> = self
            .db()
            .delete((MEETING, id.as_str().to_string()))
            .await
            .map_err(from_surrealdb_error)?;

        self.db()
            .query("DELETE work_log_integration WHERE meeting_id = $meeting_id")
            .bind(("meeting_id", id.as_str().to_string()))
            .await
            .map_err(from_surrealdb_error)?;

        Ok(())
    }

    async fn work_log_integration(
        &self,
        meeting_id: &MeetingId,
        participant_id: &ParticipantId,
    ) -> IntegrationResult<Option<WorkLogIntegration>> {
        let record: Option<IntegrationRecord> = self
            .db()
            .select((
                WORK_LOG_INTEGRATION,
                integration_key(meeting_id, participant_id),
            ))
            .await
            .map_err(from_surrealdb_error)?;

        Ok(record.map(|r| WorkLogIntegration {
            project_id: r.project_id,
            api_token: r.api_token,
        }))
    }

    async fn set_work_log_integration(
        &self,
        meeting_id: &MeetingId,
        participant_id: &ParticipantId,
        integration: WorkLogIntegration,
    ) -> IntegrationResult<()> {
        let record = IntegrationRecord {
            id: None,
            meeting_id: meeting_id.as_str().to_string(),
            participant_id: participant_id.as_str().to_string(),
            project_id: integration.project_id,
            api_token: integration.api_token,
        };

        let _: Option<IntegrationRecord> = self
            .db()
            .upsert((
                WORK_LOG_INTEGRATION,
                integration_key(meeting_id, participant_id),
            ))
            .content(record)
            .await
            .map_err(from_surrealdb_error)?;

        Ok(())
    }
}

#[async_trait]
impl ResponseLog for SurrealStore {
    async fn append(
        &self,
        meeting_id: &MeetingId,
        response: &ParticipantResponse,
        recorded_at: DateTime<Utc>,
    ) -> IntegrationResult<()> {
        let record = ResponseRecord {
            id: None,
            meeting_id: meeting_id.as_str().to_string(),
            participant_id: response.participant_id.as_str().to_string(),
            response: serde_json::to_string(&response.response).map_err(PersistenceError::from)?,
            recorded_at,
        };

        let _: Option<ResponseRecord> = self
            .db()
            .create(RESPONSE)
            .content(record)
            .await
            .map_err(from_surrealdb_error)?;

        Ok(())
    }
}

#[async_trait]
impl ActiveConversationIndex for SurrealStore {
    async fn get(&self, participant_id: &ParticipantId) -> IntegrationResult<Option<String>> {
        let record: Option<ClaimRecord> = self
            .db()
            .select((ACTIVE_CONVERSATION, participant_id.as_str().to_string()))
            .await
            .map_err(from_surrealdb_error)?;

        Ok(record.map(|r| r.conversation))
    }

    async fn try_claim(
        &self,
        participant_id: &ParticipantId,
        conversation: &str,
    ) -> IntegrationResult<ClaimOutcome> {
        let record = ClaimRecord {
            id: None,
            conversation: conversation.to_string(),
            claimed_at: Utc::now(),
        };

        // CREATE fails when the record exists, which makes the claim atomic.
        let created: Result<Option<ClaimRecord>, _> = self
            .db()
            .create((ACTIVE_CONVERSATION, participant_id.as_str().to_string()))
            .content(record)
            .await;

        match created {
            Ok(_) => Ok(ClaimOutcome::Claimed),
            Err(err) => match ActiveConversationIndex::get(self, participant_id).await? {
                Some(holder) if holder == conversation => Ok(ClaimOutcome::Claimed),
                Some(holder) => Ok(ClaimOutcome::Busy { holder }),
                None => Err(from_surrealdb_error(err).into()),
            },
        }
    }

    async fn release(
        &self,
        participant_id: &ParticipantId,
        conversation: &str,
    ) -> IntegrationResult<()> {
        self.db()
            .query("DELETE type::thing($table, $participant) WHERE conversation = $conversation")
            .bind(("table", ACTIVE_CONVERSATION))
            .bind(("participant", participant_id.as_str().to_string()))
            .bind(("conversation", conversation.to_string()))
            .await
            .map_err(from_surrealdb_error)?;

        Ok(())
    }
}
