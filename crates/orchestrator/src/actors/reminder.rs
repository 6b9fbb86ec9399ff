//! Reminder actor: one per (meeting, participant).
//!
//! Nudges the participant at the reminder time on every valid day, backs off
//! while they are answering another stand-up, and withdraws an unanswered
//! nudge after the escalation window.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::durable::{ActorContext, Behavior};
use super::errors::ActorError;
use crate::domain::{time_of_day, Frequency, MeetingId, ParticipantId};
use crate::render;
use crate::schedule;

/// Everything the reminder needs to know about its meeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderDescriptor {
    pub meeting_id: MeetingId,
    pub meeting_name: String,
    pub participant_id: ParticipantId,
    pub channel: String,
    pub frequency: Frequency,
    pub timezone: Tz,
    pub remind_at: DateTime<Utc>,
    /// Local stand-up time; nudges go out the reminder lead before it.
    #[serde(with = "time_of_day")]
    pub stand_up_time: NaiveTime,
    pub stand_up_at_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderState {
    pub descriptor: ReminderDescriptor,
    pub alerted: bool,
    /// Id of the outstanding nudge; only meaningful while `alerted`.
    #[serde(default)]
    pub alert_message_id: Option<String>,
}

/// Payload of `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderInit {
    pub meeting_id: MeetingId,
    pub participant_id: ParticipantId,
    pub channel: String,
    pub remind_at: DateTime<Utc>,
    pub timezone: Tz,
    #[serde(with = "time_of_day")]
    pub stand_up_time: NaiveTime,
    pub stand_up_at_label: String,
    pub frequency: Frequency,
    pub meeting_name: String,
}

impl ReminderInit {
    fn validate(&self) -> Result<(), ActorError> {
        if self.meeting_id.as_str().is_empty() || self.participant_id.as_str().is_empty() {
            return Err(ActorError::malformed("reminder needs a meeting and a participant"));
        }
        if self.channel.trim().is_empty() {
            return Err(ActorError::malformed("reminder channel must not be empty"));
        }
        Ok(())
    }

    fn into_descriptor(self) -> ReminderDescriptor {
        ReminderDescriptor {
            meeting_id: self.meeting_id,
            meeting_name: self.meeting_name,
            participant_id: self.participant_id,
            channel: self.channel,
            frequency: self.frequency,
            timezone: self.timezone,
            remind_at: self.remind_at,
            stand_up_time: self.stand_up_time,
            stand_up_at_label: self.stand_up_at_label,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReminderCommand {
    Initialize(ReminderInit),
    /// The participant acted on the nudge.
    DeleteAlertMessage,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Reminder;

type Ctx = ActorContext<ReminderState>;

fn next_reminder(ctx: &Ctx, descriptor: &ReminderDescriptor) -> Result<DateTime<Utc>, ActorError> {
    schedule::next_valid_occurrence_with_lead(
        ctx.now(),
        descriptor.timezone,
        descriptor.stand_up_time,
        ctx.settings().reminder_lead(),
        descriptor.frequency,
    )
    .ok_or_else(|| {
        ActorError::schedule(format!(
            "no {:?} occurrence of {} in {}",
            descriptor.frequency, descriptor.stand_up_time, descriptor.timezone
        ))
    })
}

impl Reminder {
    async fn initialize(&self, ctx: &mut Ctx, init: ReminderInit) -> Result<(), ActorError> {
        init.validate()?;
        let descriptor = init.into_descriptor();
        let participant = descriptor.participant_id.clone();
        let onboarding = render::onboarding(
            &descriptor.meeting_name,
            &descriptor.channel,
            &descriptor.stand_up_at_label,
            ctx.settings().reminder_lead_minutes,
        );

        ctx.schedule_wake_at(descriptor.remind_at);
        info!(
            actor = %ctx.name(),
            meeting_id = %descriptor.meeting_id,
            participant_id = %participant,
            remind_at = %descriptor.remind_at,
            "Reminder initialized"
        );
        ctx.replace_state(ReminderState {
            descriptor,
            alerted: false,
            alert_message_id: None,
        });
        ctx.persist().await?;

        if let Err(e) = ctx
            .integrations()
            .chat
            .post_message(participant.as_str(), onboarding)
            .await
        {
            warn!(actor = %ctx.name(), error = %e, "Failed to send onboarding message");
        }
        Ok(())
    }

    /// Clear the outstanding nudge, reschedule, then remove it from chat.
    /// Returns false if there was nothing to clear.
    async fn withdraw_nudge(&self, ctx: &mut Ctx) -> Result<bool, ActorError> {
        let state = ctx.require_state()?.clone();
        if !state.alerted {
            return Ok(false);
        }

        let next = next_reminder(ctx, &state.descriptor)?;
        {
            let state = ctx.require_state_mut()?;
            state.alerted = false;
            state.alert_message_id = None;
        }
        ctx.schedule_wake_at(next);
        ctx.persist().await?;

        if let Some(message_id) = state.alert_message_id {
            if let Err(e) = ctx
                .integrations()
                .chat
                .delete_message(state.descriptor.participant_id.as_str(), &message_id)
                .await
            {
                warn!(actor = %ctx.name(), message_id, error = %e, "Failed to delete nudge");
            }
        }
        debug!(actor = %ctx.name(), next_at = %next, "Nudge withdrawn");
        Ok(true)
    }

    fn retry_later(ctx: &mut Ctx) -> Result<DateTime<Utc>, ActorError> {
        let backoff = ctx.settings().busy_backoff();
        ctx.schedule_wake_in(backoff)
    }
}

#[async_trait]
impl Behavior for Reminder {
    const KIND: &'static str = "reminder";

    type State = ReminderState;
    type Command = ReminderCommand;

    async fn handle(&self, ctx: &mut Ctx, command: ReminderCommand) -> Result<(), ActorError> {
        match command {
            ReminderCommand::Initialize(init) => self.initialize(ctx, init).await,
            ReminderCommand::DeleteAlertMessage => {
                if !self.withdraw_nudge(ctx).await? {
                    debug!(actor = %ctx.name(), "No outstanding nudge to delete");
                }
                Ok(())
            }
        }
    }

    async fn wake(&self, ctx: &mut Ctx) -> Result<(), ActorError> {
        let state = ctx.require_state()?.clone();
        let descriptor = &state.descriptor;
        let integrations = ctx.integrations().clone();

        // Store lookups that fail are retried after the backoff.
        let exists = match integrations.meetings.exists(&descriptor.meeting_id).await {
            Ok(exists) => exists,
            Err(e) => {
                Self::retry_later(ctx)?;
                return Err(e.into());
            }
        };
        if !exists {
            info!(actor = %ctx.name(), meeting_id = %descriptor.meeting_id, "Meeting gone, reminder destroyed");
            ctx.destroy();
            return Ok(());
        }

        let busy = match integrations.active.get(&descriptor.participant_id).await {
            Ok(holder) => holder,
            Err(e) => {
                Self::retry_later(ctx)?;
                return Err(e.into());
            }
        };
        if let Some(holder) = busy {
            let at = Self::retry_later(ctx)?;
            debug!(actor = %ctx.name(), holder, retry_at = %at, "Participant busy, nudge postponed");
            return Ok(());
        }

        if state.alerted {
            self.withdraw_nudge(ctx).await?;
            let missed = render::missed(&descriptor.participant_id, &descriptor.meeting_name);
            if let Err(e) = integrations
                .chat
                .post_message(descriptor.participant_id.as_str(), missed)
                .await
            {
                warn!(actor = %ctx.name(), error = %e, "Failed to send missed notice");
            }
            info!(actor = %ctx.name(), participant_id = %descriptor.participant_id, "Nudge expired unanswered");
            return Ok(());
        }

        // The day that counts is the stand-up's, which may be tomorrow.
        let stand_up_day = ctx
            .now()
            .checked_add_signed(ctx.settings().reminder_lead())
            .ok_or_else(|| ActorError::schedule("stand-up instant overflows"))?
            .with_timezone(&descriptor.timezone)
            .weekday();
        if !descriptor.frequency.is_valid_day(stand_up_day) {
            let next = next_reminder(ctx, descriptor)?;
            ctx.schedule_wake_at(next);
            debug!(actor = %ctx.name(), ?stand_up_day, next_at = %next, "Not a stand-up day");
            return Ok(());
        }

        let escalation = ctx.settings().escalation();
        let expires_at = ctx.schedule_wake_in(escalation)?;
        {
            let state = ctx.require_state_mut()?;
            state.alerted = true;
            state.alert_message_id = None;
        }
        ctx.persist().await?;

        let nudge = render::nudge(&descriptor.participant_id, &descriptor.meeting_id);
        match integrations
            .chat
            .post_message(descriptor.participant_id.as_str(), nudge)
            .await
        {
            Ok(receipt) => {
                ctx.require_state_mut()?.alert_message_id = Some(receipt.message_id);
                info!(
                    actor = %ctx.name(),
                    participant_id = %descriptor.participant_id,
                    expires_at = %expires_at,
                    "Nudge sent"
                );
            }
            Err(e) => {
                warn!(actor = %ctx.name(), error = %e, "Failed to send nudge");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use super::*;

    #[test]
    fn given_initialize_payload_when_parsed_then_descriptor_keeps_stand_up_time() {
        let payload = r#"{
            "type": "initialize",
            "meeting_id": "m1",
            "participant_id": "U1",
            "channel": "C1",
            "remind_at": "2024-03-04T04:30:00Z",
            "timezone": "Asia/Kolkata",
            "stand_up_time": "10:30",
            "stand_up_at_label": "10:30 AM",
            "frequency": "weekdays",
            "meeting_name": "Platform"
        }"#;

        let ReminderCommand::Initialize(init) = serde_json::from_str(payload).unwrap() else {
            panic!("expected initialize");
        };
        let descriptor = init.into_descriptor();

        assert_eq!(descriptor.stand_up_time, NaiveTime::from_hms_opt(10, 30, 0).unwrap());
        assert_eq!(descriptor.remind_at.to_rfc3339(), "2024-03-04T04:30:00+00:00");
        assert_eq!(descriptor.timezone, chrono_tz::Asia::Kolkata);
    }

    #[test]
    fn given_unknown_tag_when_parsed_then_unknown_command() {
        let err = serde_json::from_str::<ReminderCommand>(r#"{"type":"snooze"}"#).unwrap_err();
        assert!(matches!(
            ActorError::from_payload_error(&err),
            ActorError::UnknownCommand(_)
        ));
    }

    #[test]
    fn given_empty_channel_when_validated_then_malformed() {
        let init = ReminderInit {
            meeting_id: MeetingId::new("m1"),
            participant_id: ParticipantId::new("U1"),
            channel: " ".into(),
            remind_at: Utc::now(),
            timezone: chrono_tz::UTC,
            stand_up_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            stand_up_at_label: "9:00 AM".into(),
            frequency: Frequency::EveryDay,
            meeting_name: "Core".into(),
        };
        assert!(matches!(init.validate(), Err(ActorError::MalformedMessage(_))));
    }
}
