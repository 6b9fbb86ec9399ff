//! Brief actor: one per meeting.
//!
//! Buffers response records while `Accumulating`, publishes the summary at
//! stand-up time and then stays `Published` for the grace window, during
//! which each late record is posted on its own.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::durable::{ActorContext, Behavior};
use super::errors::ActorError;
use crate::domain::{time_of_day, MeetingId, ParticipantId, ParticipantResponse};
use crate::render::{self, BriefSummary};
use crate::schedule;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefDescriptor {
    pub meeting_id: MeetingId,
    pub channel: String,
    pub timezone: Tz,
    #[serde(with = "time_of_day")]
    pub stand_up_time: NaiveTime,
    pub next_brief_at: DateTime<Utc>,
    pub participant_ids: BTreeSet<ParticipantId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BriefPhase {
    Accumulating,
    Published,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefState {
    pub descriptor: BriefDescriptor,
    pub phase: BriefPhase,
    pub pending_responses: Vec<ParticipantResponse>,
}

/// Payload of `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefInit {
    pub meeting_id: MeetingId,
    pub channel: String,
    pub timezone: Tz,
    #[serde(with = "time_of_day")]
    pub stand_up_time: NaiveTime,
    pub participant_ids: BTreeSet<ParticipantId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BriefCommand {
    Initialize(BriefInit),
    RecordResponse(ParticipantResponse),
    AddParticipants { participant_ids: Vec<ParticipantId> },
    RemoveParticipants { participant_ids: Vec<ParticipantId> },
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Brief;

type Ctx = ActorContext<BriefState>;

fn next_brief(ctx: &Ctx, tz: Tz, time: NaiveTime) -> Result<DateTime<Utc>, ActorError> {
    schedule::next_occurrence(ctx.now(), tz, time)
        .ok_or_else(|| ActorError::schedule(format!("no occurrence of {time} in {tz}")))
}

impl Brief {
    async fn initialize(&self, ctx: &mut Ctx, init: BriefInit) -> Result<(), ActorError> {
        if init.channel.trim().is_empty() {
            return Err(ActorError::malformed("brief channel must not be empty"));
        }

        let next_brief_at = next_brief(ctx, init.timezone, init.stand_up_time)?;
        info!(
            actor = %ctx.name(),
            meeting_id = %init.meeting_id,
            participants = init.participant_ids.len(),
            next_brief_at = %next_brief_at,
            "Brief initialized"
        );

        ctx.replace_state(BriefState {
            descriptor: BriefDescriptor {
                meeting_id: init.meeting_id,
                channel: init.channel,
                timezone: init.timezone,
                stand_up_time: init.stand_up_time,
                next_brief_at,
                participant_ids: init.participant_ids,
            },
            phase: BriefPhase::Accumulating,
            pending_responses: Vec::new(),
        });
        ctx.schedule_wake_at(next_brief_at);
        ctx.persist().await
    }

    async fn record(&self, ctx: &mut Ctx, response: ParticipantResponse) -> Result<(), ActorError> {
        let Some(state) = ctx.state().cloned() else {
            // Nobody initialized this meeting's brief; it has been deleted.
            info!(actor = %ctx.name(), "Response for unknown brief dropped");
            ctx.destroy();
            return Ok(());
        };
        let integrations = ctx.integrations().clone();

        if let Err(e) = integrations
            .responses
            .append(&state.descriptor.meeting_id, &response, ctx.now())
            .await
        {
            warn!(actor = %ctx.name(), error = %e, "Failed to append response to audit log");
        }

        match state.phase {
            BriefPhase::Published => {
                let late = render::late_response(&response);
                if let Err(e) = integrations
                    .chat
                    .post_message(&state.descriptor.channel, late)
                    .await
                {
                    warn!(actor = %ctx.name(), error = %e, "Failed to post late response");
                }
                debug!(actor = %ctx.name(), participant_id = %response.participant_id, "Late response posted");
            }
            BriefPhase::Accumulating => {
                debug!(actor = %ctx.name(), participant_id = %response.participant_id, "Response buffered");
                let pending = &mut ctx.require_state_mut()?.pending_responses;
                pending.retain(|r| r.participant_id != response.participant_id);
                pending.push(response);
                ctx.persist().await?;
            }
        }
        Ok(())
    }

    async fn publish(&self, ctx: &mut Ctx, state: BriefState) -> Result<(), ActorError> {
        let descriptor = &state.descriptor;
        let summary = BriefSummary::partition(&descriptor.participant_ids, &state.pending_responses);
        let date = ctx.now().with_timezone(&descriptor.timezone).date_naive();

        {
            let state = ctx.require_state_mut()?;
            state.pending_responses.clear();
            state.phase = BriefPhase::Published;
        }
        let grace = ctx.settings().brief_grace();
        let reset_at = ctx.schedule_wake_in(grace)?;
        ctx.persist().await?;

        info!(
            actor = %ctx.name(),
            meeting_id = %descriptor.meeting_id,
            responded = summary.responded(),
            no_response = summary.no_response.len(),
            reset_at = %reset_at,
            "Brief published"
        );
        if let Err(e) = ctx
            .integrations()
            .chat
            .post_message(&descriptor.channel, render::brief(date, &summary))
            .await
        {
            warn!(actor = %ctx.name(), error = %e, "Failed to post brief");
        }
        Ok(())
    }

    fn reset(&self, ctx: &mut Ctx, state: &BriefState) -> Result<(), ActorError> {
        let descriptor = &state.descriptor;
        let next_brief_at = next_brief(ctx, descriptor.timezone, descriptor.stand_up_time)?;
        {
            let state = ctx.require_state_mut()?;
            state.phase = BriefPhase::Accumulating;
            state.descriptor.next_brief_at = next_brief_at;
        }
        ctx.schedule_wake_at(next_brief_at);
        debug!(actor = %ctx.name(), next_brief_at = %next_brief_at, "Brief cycle reset");
        Ok(())
    }
}

#[async_trait]
impl Behavior for Brief {
    const KIND: &'static str = "brief";

    type State = BriefState;
    type Command = BriefCommand;

    async fn handle(&self, ctx: &mut Ctx, command: BriefCommand) -> Result<(), ActorError> {
        match command {
            BriefCommand::Initialize(init) => self.initialize(ctx, init).await,
            BriefCommand::RecordResponse(response) => self.record(ctx, response).await,
            BriefCommand::AddParticipants { participant_ids } => {
                let state = ctx.require_state_mut()?;
                state.descriptor.participant_ids.extend(participant_ids);
                Ok(())
            }
            BriefCommand::RemoveParticipants { participant_ids } => {
                let state = ctx.require_state_mut()?;
                for participant in &participant_ids {
                    state.descriptor.participant_ids.remove(participant);
                }
                state
                    .pending_responses
                    .retain(|r| !participant_ids.contains(&r.participant_id));
                Ok(())
            }
        }
    }

    async fn wake(&self, ctx: &mut Ctx) -> Result<(), ActorError> {
        let state = ctx.require_state()?.clone();
        let meeting_id = &state.descriptor.meeting_id;

        let meetings = ctx.integrations().meetings.clone();
        let exists = match meetings.exists(meeting_id).await {
            Ok(exists) => exists,
            Err(e) => {
                let backoff = ctx.settings().busy_backoff();
                ctx.schedule_wake_in(backoff)?;
                return Err(e.into());
            }
        };
        if !exists {
            info!(actor = %ctx.name(), meeting_id = %meeting_id, "Meeting gone, brief destroyed");
            ctx.destroy();
            return Ok(());
        }

        match state.phase {
            BriefPhase::Published => self.reset(ctx, &state),
            BriefPhase::Accumulating => self.publish(ctx, state).await,
        }
    }
}
