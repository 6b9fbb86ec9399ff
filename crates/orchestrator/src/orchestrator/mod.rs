//! Meeting orchestration.
//!
//! [`MeetingOrchestrator`] creates and tears down the actor triad of a
//! meeting (one Reminder and one Conversation per participant, one Brief per
//! meeting) and routes participant interactions to the right actor. It holds
//! no state of its own beyond the runtime.

pub mod error;

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use error::{OrchestratorError, OrchestratorResult};

use crate::actors::{
    ActorRuntime, BriefCommand, BriefInit, ConversationCommand, ConversationInit,
    ReminderCommand, ReminderInit,
};
use crate::domain::{
    Meeting, MeetingId, ParticipantId, ParticipantResponse, WorkLogIntegration,
    participant_actor_name,
};
use crate::integrations::NudgeAction;
use crate::render;
use crate::schedule;

/// What happened to a participant interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum InteractionOutcome {
    /// The conversation was asked to start.
    Started,
    /// Another conversation holds the participant; the busy dialog was shown.
    Busy { holder: String },
    /// A skip or on-leave record went to the brief.
    Recorded,
    /// A direct message went to the active conversation.
    Routed { conversation: String },
    /// Nothing to do.
    Ignored,
}

/// Entry point for meeting lifecycle and participant interactions.
#[derive(Debug, Clone)]
pub struct MeetingOrchestrator {
    runtime: Arc<ActorRuntime>,
}

impl MeetingOrchestrator {
    #[must_use]
    pub fn new(runtime: Arc<ActorRuntime>) -> Self {
        Self { runtime }
    }

    #[must_use]
    pub fn runtime(&self) -> &Arc<ActorRuntime> {
        &self.runtime
    }

    /// Store the meeting and initialize its actors.
    ///
    /// Membership of an existing meeting changes through
    /// [`MeetingOrchestrator::add_participants`] and
    /// [`MeetingOrchestrator::remove_participants`], never through a second
    /// create.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMeeting` if validation fails, `MeetingAlreadyExists`
    /// if the id is taken, or the store and actor errors of the setup.
    pub async fn create_meeting(&self, meeting: Meeting) -> OrchestratorResult<Meeting> {
        meeting.validate()?;
        let meetings = &self.runtime.integrations().meetings;
        if meetings.exists(&meeting.id).await? {
            return Err(OrchestratorError::meeting_already_exists(&meeting.id));
        }
        meetings.save(&meeting).await?;

        self.initialize_participants(&meeting, &meeting.participants)
            .await?;

        let brief = self.runtime.brief(&meeting.id).await?;
        brief.send(BriefCommand::Initialize(BriefInit {
            meeting_id: meeting.id.clone(),
            channel: meeting.channel.clone(),
            timezone: meeting.timezone,
            stand_up_time: meeting.time,
            participant_ids: meeting.participants.clone(),
        }))?;

        info!(
            meeting_id = %meeting.id,
            name = %meeting.name,
            participants = meeting.participants.len(),
            "Meeting created"
        );
        Ok(meeting)
    }

    /// Destroy every actor of the meeting, then the meeting record.
    ///
    /// The record goes last, so after a failure the same call can be
    /// repeated; destroying an actor that is already gone is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `MeetingNotFound` for an unknown id, or the destroy errors.
    pub async fn delete_meeting(&self, meeting_id: &MeetingId) -> OrchestratorResult<()> {
        let meeting = self.require_meeting(meeting_id).await?;

        self.destroy_participants(meeting_id, &meeting.participants)
            .await?;
        self.runtime.destroy_brief(meeting_id).await?;
        self.runtime.integrations().meetings.delete(meeting_id).await?;

        info!(meeting_id = %meeting_id, "Meeting deleted");
        Ok(())
    }

    /// Add participants; returns the ones that were new.
    ///
    /// # Errors
    ///
    /// Returns `MeetingNotFound`, or the store and actor errors.
    pub async fn add_participants(
        &self,
        meeting_id: &MeetingId,
        participants: Vec<ParticipantId>,
    ) -> OrchestratorResult<Vec<ParticipantId>> {
        let mut meeting = self.require_meeting(meeting_id).await?;
        let added: BTreeSet<ParticipantId> = participants
            .into_iter()
            .filter(|p| !meeting.participants.contains(p))
            .collect();
        if added.is_empty() {
            return Ok(Vec::new());
        }

        meeting.participants.extend(added.iter().cloned());
        self.runtime.integrations().meetings.save(&meeting).await?;
        self.initialize_participants(&meeting, &added).await?;

        let added: Vec<ParticipantId> = added.into_iter().collect();
        self.runtime
            .brief(meeting_id)
            .await?
            .send(BriefCommand::AddParticipants {
                participant_ids: added.clone(),
            })?;

        info!(meeting_id = %meeting_id, added = added.len(), "Participants added");
        Ok(added)
    }

    /// Remove participants; returns the ones that were members.
    ///
    /// # Errors
    ///
    /// Returns `MeetingNotFound`, or the store and actor errors.
    pub async fn remove_participants(
        &self,
        meeting_id: &MeetingId,
        participants: Vec<ParticipantId>,
    ) -> OrchestratorResult<Vec<ParticipantId>> {
        let mut meeting = self.require_meeting(meeting_id).await?;
        let removed: BTreeSet<ParticipantId> = participants
            .into_iter()
            .filter(|p| meeting.participants.contains(p))
            .collect();
        if removed.is_empty() {
            return Ok(Vec::new());
        }

        meeting.participants.retain(|p| !removed.contains(p));
        self.runtime.integrations().meetings.save(&meeting).await?;
        self.destroy_participants(meeting_id, &removed).await?;

        let removed: Vec<ParticipantId> = removed.into_iter().collect();
        self.runtime
            .brief(meeting_id)
            .await?
            .send(BriefCommand::RemoveParticipants {
                participant_ids: removed.clone(),
            })?;

        info!(meeting_id = %meeting_id, removed = removed.len(), "Participants removed");
        Ok(removed)
    }

    /// Route a nudge button press.
    ///
    /// # Errors
    ///
    /// See [`MeetingOrchestrator::submit`] and [`MeetingOrchestrator::skip`].
    pub async fn handle_action(
        &self,
        action: NudgeAction,
        meeting_id: &MeetingId,
        participant: &ParticipantId,
    ) -> OrchestratorResult<InteractionOutcome> {
        match action {
            NudgeAction::Submit => self.submit(meeting_id, participant).await,
            NudgeAction::Skip => self.skip(meeting_id, participant).await,
            NudgeAction::OnLeave => self.on_leave(meeting_id, participant).await,
        }
    }

    /// The participant pressed "Submit".
    ///
    /// If another conversation holds the participant the busy dialog is shown
    /// and the nudge stays. Otherwise the nudge is removed and the
    /// conversation starts; the conversation claims the participant itself,
    /// so a race lost here still ends in the busy dialog.
    ///
    /// # Errors
    ///
    /// Returns `MeetingNotFound`, or the store and actor errors.
    pub async fn submit(
        &self,
        meeting_id: &MeetingId,
        participant: &ParticipantId,
    ) -> OrchestratorResult<InteractionOutcome> {
        self.require_meeting(meeting_id).await?;
        let integrations = self.runtime.integrations();
        let name = participant_actor_name(meeting_id, participant);

        if let Some(holder) = integrations.active.get(participant).await? {
            if holder != name {
                if let Err(e) = integrations
                    .chat
                    .open_dialog(participant, render::busy_dialog())
                    .await
                {
                    warn!(participant_id = %participant, error = %e, "Failed to open busy dialog");
                }
                debug!(participant_id = %participant, holder, "Submit refused, participant busy");
                return Ok(InteractionOutcome::Busy { holder });
            }
        }

        self.runtime
            .reminder(&name)
            .await?
            .send(ReminderCommand::DeleteAlertMessage)?;
        self.runtime
            .conversation(&name)
            .await?
            .send(ConversationCommand::StartConversation)?;
        Ok(InteractionOutcome::Started)
    }

    /// The participant pressed "Skip".
    ///
    /// # Errors
    ///
    /// Returns `MeetingNotFound`, or the actor errors.
    pub async fn skip(
        &self,
        meeting_id: &MeetingId,
        participant: &ParticipantId,
    ) -> OrchestratorResult<InteractionOutcome> {
        self.record(meeting_id, ParticipantResponse::skipped(participant.clone()))
            .await
    }

    /// The participant pressed "On leave".
    ///
    /// # Errors
    ///
    /// Returns `MeetingNotFound`, or the actor errors.
    pub async fn on_leave(
        &self,
        meeting_id: &MeetingId,
        participant: &ParticipantId,
    ) -> OrchestratorResult<InteractionOutcome> {
        self.record(meeting_id, ParticipantResponse::on_leave(participant.clone()))
            .await
    }

    /// Route a direct message to the participant's active conversation.
    ///
    /// # Errors
    ///
    /// Returns the index and actor errors.
    pub async fn direct_message(
        &self,
        participant: &ParticipantId,
        text: String,
    ) -> OrchestratorResult<InteractionOutcome> {
        let Some(conversation) = self.runtime.integrations().active.get(participant).await? else {
            debug!(participant_id = %participant, "Direct message outside a conversation");
            return Ok(InteractionOutcome::Ignored);
        };

        self.runtime
            .conversation(&conversation)
            .await?
            .send(ConversationCommand::Response { text })?;
        Ok(InteractionOutcome::Routed { conversation })
    }

    /// Attach issue-tracker credentials to a participant of a meeting.
    ///
    /// # Errors
    ///
    /// Returns `MeetingNotFound`, or the store errors.
    pub async fn set_work_log_integration(
        &self,
        meeting_id: &MeetingId,
        participant: &ParticipantId,
        integration: WorkLogIntegration,
    ) -> OrchestratorResult<()> {
        self.require_meeting(meeting_id).await?;
        self.runtime
            .integrations()
            .meetings
            .set_work_log_integration(meeting_id, participant, integration)
            .await?;
        Ok(())
    }

    async fn record(
        &self,
        meeting_id: &MeetingId,
        response: ParticipantResponse,
    ) -> OrchestratorResult<InteractionOutcome> {
        self.require_meeting(meeting_id).await?;
        let name = participant_actor_name(meeting_id, &response.participant_id);

        self.runtime
            .reminder(&name)
            .await?
            .send(ReminderCommand::DeleteAlertMessage)?;
        self.runtime
            .brief(meeting_id)
            .await?
            .send(BriefCommand::RecordResponse(response))?;
        Ok(InteractionOutcome::Recorded)
    }

    async fn require_meeting(&self, meeting_id: &MeetingId) -> OrchestratorResult<Meeting> {
        self.runtime
            .integrations()
            .meetings
            .get(meeting_id)
            .await?
            .ok_or_else(|| OrchestratorError::meeting_not_found(meeting_id))
    }

    async fn initialize_participants(
        &self,
        meeting: &Meeting,
        participants: &BTreeSet<ParticipantId>,
    ) -> OrchestratorResult<()> {
        let remind_at = schedule::next_valid_occurrence_with_lead(
            self.runtime.now(),
            meeting.timezone,
            meeting.time,
            self.runtime.settings().reminder_lead(),
            meeting.frequency,
        )
        .ok_or_else(|| {
            OrchestratorError::schedule(format!(
                "no {:?} occurrence of {} in {}",
                meeting.frequency, meeting.time, meeting.timezone
            ))
        })?;
        let label = meeting.stand_up_at_label();

        try_join_all(participants.iter().map(|participant| {
            let name = participant_actor_name(&meeting.id, participant);
            let reminder = ReminderCommand::Initialize(ReminderInit {
                meeting_id: meeting.id.clone(),
                participant_id: participant.clone(),
                channel: meeting.channel.clone(),
                remind_at,
                timezone: meeting.timezone,
                stand_up_time: meeting.time,
                stand_up_at_label: label.clone(),
                frequency: meeting.frequency,
                meeting_name: meeting.name.clone(),
            });
            let conversation = ConversationCommand::Initialize(ConversationInit {
                meeting_id: meeting.id.clone(),
                participant_id: participant.clone(),
                timezone: meeting.timezone,
                questions: meeting.questions.clone(),
            });
            async move {
                self.runtime.reminder(&name).await?.send(reminder)?;
                self.runtime.conversation(&name).await?.send(conversation)?;
                Ok::<_, OrchestratorError>(())
            }
        }))
        .await?;

        debug!(meeting_id = %meeting.id, participants = participants.len(), remind_at = %remind_at, "Participants initialized");
        Ok(())
    }

    /// Destroy the actor pair of every participant. Every pair is attempted
    /// even if one fails; the first failure is returned.
    async fn destroy_participants(
        &self,
        meeting_id: &MeetingId,
        participants: &BTreeSet<ParticipantId>,
    ) -> OrchestratorResult<()> {
        let results = join_all(participants.iter().map(|participant| {
            let name = participant_actor_name(meeting_id, participant);
            async move {
                let reminder = self.runtime.destroy_reminder(&name).await;
                let conversation = self.runtime.destroy_conversation(&name).await;
                reminder.and(conversation).inspect_err(|e| {
                    warn!(meeting_id = %meeting_id, actor = %name, error = %e, "Failed to destroy participant actors");
                })
            }
        }))
        .await;

        results.into_iter().collect::<Result<Vec<()>, _>>()?;
        Ok(())
    }
}
