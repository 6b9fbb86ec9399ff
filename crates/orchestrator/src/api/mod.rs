//! HTTP API: a thin adapter over [`MeetingOrchestrator`].

use std::collections::BTreeSet;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::domain::{
    Frequency, Meeting, MeetingId, ParticipantId, Question, WorkLogIntegration, time_of_day,
};
use crate::integrations::NudgeAction;
use crate::orchestrator::{InteractionOutcome, MeetingOrchestrator, OrchestratorError};

/// API server state.
#[derive(Debug, Clone)]
pub struct ApiState {
    orchestrator: MeetingOrchestrator,
}

impl ApiState {
    #[must_use]
    pub fn new(orchestrator: MeetingOrchestrator) -> Self {
        Self { orchestrator }
    }
}

/// Create meeting request body. The id is generated when absent.
#[derive(Debug, Deserialize)]
pub struct CreateMeetingRequest {
    #[serde(default)]
    pub id: Option<MeetingId>,
    pub owner: String,
    pub name: String,
    pub channel: String,
    pub questions: Vec<Question>,
    pub frequency: Frequency,
    #[serde(with = "time_of_day")]
    pub time: NaiveTime,
    pub timezone: Tz,
    #[serde(default)]
    pub participants: BTreeSet<ParticipantId>,
}

impl CreateMeetingRequest {
    fn into_meeting(self) -> Meeting {
        Meeting {
            id: self.id.unwrap_or_else(MeetingId::generate),
            owner: self.owner,
            name: self.name,
            channel: self.channel,
            questions: self.questions,
            frequency: self.frequency,
            time: self.time,
            timezone: self.timezone,
            participants: self.participants,
        }
    }
}

/// Participant add/remove body and response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ParticipantsBody {
    pub participants: Vec<ParticipantId>,
}

/// A nudge button press.
#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub action: NudgeAction,
    pub meeting_id: MeetingId,
    pub participant_id: ParticipantId,
}

/// A direct message from a participant.
#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub participant_id: ParticipantId,
    pub text: String,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Maps orchestrator failures onto status codes.
#[derive(Debug)]
pub struct ApiError(OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            OrchestratorError::MeetingNotFound(_) => StatusCode::NOT_FOUND,
            OrchestratorError::MeetingAlreadyExists(_) => StatusCode::CONFLICT,
            err if err.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// POST /meetings
pub async fn create_meeting(
    State(state): State<ApiState>,
    Json(req): Json<CreateMeetingRequest>,
) -> Result<(StatusCode, Json<Meeting>), ApiError> {
    let meeting = state.orchestrator.create_meeting(req.into_meeting()).await?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

/// DELETE /meetings/{id}
pub async fn delete_meeting(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orchestrator.delete_meeting(&MeetingId::new(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /meetings/{id}/participants
pub async fn add_participants(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<ParticipantsBody>,
) -> Result<Json<ParticipantsBody>, ApiError> {
    let added = state
        .orchestrator
        .add_participants(&MeetingId::new(id), body.participants)
        .await?;
    Ok(Json(ParticipantsBody {
        participants: added,
    }))
}

/// DELETE /meetings/{id}/participants
pub async fn remove_participants(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<ParticipantsBody>,
) -> Result<Json<ParticipantsBody>, ApiError> {
    let removed = state
        .orchestrator
        .remove_participants(&MeetingId::new(id), body.participants)
        .await?;
    Ok(Json(ParticipantsBody {
        participants: removed,
    }))
}

/// PUT /meetings/{id}/participants/{participant}/work-log
pub async fn set_work_log(
    State(state): State<ApiState>,
    Path((id, participant)): Path<(String, String)>,
    Json(integration): Json<WorkLogIntegration>,
) -> Result<StatusCode, ApiError> {
    state
        .orchestrator
        .set_work_log_integration(
            &MeetingId::new(id),
            &ParticipantId::new(participant),
            integration,
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /interactions
pub async fn interaction(
    State(state): State<ApiState>,
    Json(req): Json<InteractionRequest>,
) -> Result<Json<InteractionOutcome>, ApiError> {
    let outcome = state
        .orchestrator
        .handle_action(req.action, &req.meeting_id, &req.participant_id)
        .await?;
    Ok(Json(outcome))
}

/// POST /messages
pub async fn direct_message(
    State(state): State<ApiState>,
    Json(req): Json<MessageRequest>,
) -> Result<Json<InteractionOutcome>, ApiError> {
    let outcome = state
        .orchestrator
        .direct_message(&req.participant_id, req.text)
        .await?;
    Ok(Json(outcome))
}

/// All routes, traced.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/meetings", post(create_meeting))
        .route("/meetings/{id}", axum::routing::delete(delete_meeting))
        .route(
            "/meetings/{id}/participants",
            post(add_participants).delete(remove_participants),
        )
        .route(
            "/meetings/{id}/participants/{participant}/work-log",
            put(set_work_log),
        )
        .route("/interactions", post(interaction))
        .route("/messages", post(direct_message))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
