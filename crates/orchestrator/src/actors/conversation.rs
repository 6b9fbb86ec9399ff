//! Conversation actor: the question/answer exchange with one participant for
//! one meeting.
//!
//! `Idle -> Active -> Idle`. While active the participant is claimed in the
//! active-conversation index, so no other conversation can start for them.

use async_trait::async_trait;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::brief::BriefCommand;
use super::durable::{ActorContext, Behavior};
use super::errors::ActorError;
use crate::domain::{Answer, MeetingId, ParticipantId, ParticipantResponse, Question};
use crate::integrations::{ChatMessage, ClaimOutcome};
use crate::render;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationDescriptor {
    pub meeting_id: MeetingId,
    pub participant_id: ParticipantId,
    pub timezone: Tz,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    Idle,
    Active,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub descriptor: ConversationDescriptor,
    pub phase: ConversationPhase,
    pub current_question_index: usize,
    pub answers: Vec<Answer>,
}

impl ConversationState {
    fn idle(descriptor: ConversationDescriptor) -> Self {
        Self {
            descriptor,
            phase: ConversationPhase::Idle,
            current_question_index: 0,
            answers: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.phase = ConversationPhase::Idle;
        self.current_question_index = 0;
        self.answers.clear();
    }
}

/// Payload of `initialize`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationInit {
    pub meeting_id: MeetingId,
    pub participant_id: ParticipantId,
    pub timezone: Tz,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationCommand {
    Initialize(ConversationInit),
    StartConversation,
    /// A direct message from the participant.
    Response { text: String },
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Conversation;

type Ctx = ActorContext<ConversationState>;

impl Conversation {
    async fn initialize(&self, ctx: &mut Ctx, init: ConversationInit) -> Result<(), ActorError> {
        if init.questions.is_empty() {
            return Err(ActorError::malformed("conversation needs at least one question"));
        }

        // Re-initializing mid-conversation abandons it.
        if let Some(previous) = ctx.state() {
            if previous.phase == ConversationPhase::Active {
                let participant = previous.descriptor.participant_id.clone();
                self.release(ctx, &participant).await;
            }
        }

        info!(
            actor = %ctx.name(),
            meeting_id = %init.meeting_id,
            participant_id = %init.participant_id,
            questions = init.questions.len(),
            "Conversation initialized"
        );
        ctx.replace_state(ConversationState::idle(ConversationDescriptor {
            meeting_id: init.meeting_id,
            participant_id: init.participant_id,
            timezone: init.timezone,
            questions: init.questions,
        }));
        ctx.persist().await
    }

    async fn start(&self, ctx: &mut Ctx) -> Result<(), ActorError> {
        let state = ctx.require_state()?.clone();
        if state.phase == ConversationPhase::Active {
            debug!(actor = %ctx.name(), "Conversation already active");
            return Ok(());
        }

        let Some(first) = state.descriptor.questions.first() else {
            return Err(ActorError::malformed("conversation has no questions"));
        };
        let participant = state.descriptor.participant_id.clone();
        let integrations = ctx.integrations().clone();
        let claim = integrations
            .active
            .try_claim(&participant, ctx.name())
            .await?;

        if let ClaimOutcome::Busy { holder } = claim {
            if let Err(e) = integrations
                .chat
                .open_dialog(&participant, render::busy_dialog())
                .await
            {
                warn!(actor = %ctx.name(), error = %e, "Failed to open busy dialog");
            }
            return Err(ActorError::Busy {
                participant: participant.to_string(),
                holder,
            });
        }

        {
            let state = ctx.require_state_mut()?;
            state.reset();
            state.phase = ConversationPhase::Active;
        }
        ctx.persist().await?;
        info!(actor = %ctx.name(), participant_id = %participant, "Conversation started");

        if let Err(e) = integrations
            .chat
            .post_message(participant.as_str(), render::question(&first.text))
            .await
        {
            warn!(actor = %ctx.name(), error = %e, "Failed to send first question");
        }
        Ok(())
    }

    async fn respond(&self, ctx: &mut Ctx, text: String) -> Result<(), ActorError> {
        let state = ctx.require_state()?;
        if state.phase != ConversationPhase::Active {
            debug!(actor = %ctx.name(), "Message outside a conversation ignored");
            return Ok(());
        }

        let index = state.current_question_index;
        let question = state
            .descriptor
            .questions
            .get(index)
            .cloned()
            .ok_or_else(|| ActorError::malformed(format!("no question at index {index}")))?;
        let next_index = index.saturating_add(1);
        let next_question = state.descriptor.questions.get(next_index).cloned();
        let participant = state.descriptor.participant_id.clone();

        {
            let state = ctx.require_state_mut()?;
            state.answers.push(Answer {
                question_id: question.id,
                question: question.text,
                answer: text,
            });
            state.current_question_index = next_index;
        }

        let Some(next_question) = next_question else {
            return self.complete(ctx).await;
        };

        ctx.persist().await?;
        if let Err(e) = ctx
            .integrations()
            .chat
            .post_message(participant.as_str(), render::question(&next_question.text))
            .await
        {
            warn!(actor = %ctx.name(), error = %e, "Failed to send next question");
        }
        Ok(())
    }

    async fn complete(&self, ctx: &mut Ctx) -> Result<(), ActorError> {
        let (descriptor, answers) = {
            let state = ctx.require_state_mut()?;
            let answers = std::mem::take(&mut state.answers);
            state.reset();
            (state.descriptor.clone(), answers)
        };
        ctx.persist().await?;

        let participant = descriptor.participant_id.clone();
        let response = ParticipantResponse::submitted(participant.clone(), answers.clone());
        let delivered = ctx
            .runtime()
            .brief(&descriptor.meeting_id)
            .await
            .and_then(|brief| brief.send(BriefCommand::RecordResponse(response)));
        if let Err(e) = delivered {
            warn!(actor = %ctx.name(), meeting_id = %descriptor.meeting_id, error = %e, "Failed to forward response to brief");
        }

        self.release(ctx, &participant).await;

        let integrations = ctx.integrations().clone();
        if let Err(e) = integrations
            .chat
            .post_message(participant.as_str(), render::acknowledgement())
            .await
        {
            warn!(actor = %ctx.name(), error = %e, "Failed to acknowledge response");
        }
        info!(
            actor = %ctx.name(),
            participant_id = %participant,
            answers = answers.len(),
            "Conversation completed"
        );

        let integration = match integrations
            .meetings
            .work_log_integration(&descriptor.meeting_id, &participant)
            .await
        {
            Ok(integration) => integration,
            Err(e) => {
                warn!(actor = %ctx.name(), error = %e, "Failed to look up work-log integration");
                None
            }
        };
        let Some(integration) = integration else {
            return Ok(());
        };

        match integrations
            .work_log
            .submit_work_log(&integration, descriptor.timezone, &answers)
            .await
        {
            Ok(message) => {
                if let Err(e) = integrations
                    .chat
                    .post_message(participant.as_str(), ChatMessage::text(message))
                    .await
                {
                    warn!(actor = %ctx.name(), error = %e, "Failed to relay work-log result");
                }
            }
            Err(e) => {
                warn!(actor = %ctx.name(), project_id = %integration.project_id, error = %e, "Work-log submission failed");
            }
        }
        Ok(())
    }

    async fn release(&self, ctx: &Ctx, participant: &ParticipantId) {
        if let Err(e) = ctx
            .integrations()
            .active
            .release(participant, ctx.name())
            .await
        {
            warn!(actor = %ctx.name(), participant_id = %participant, error = %e, "Failed to release conversation claim");
        }
    }
}

#[async_trait]
impl Behavior for Conversation {
    const KIND: &'static str = "conversation";

    type State = ConversationState;
    type Command = ConversationCommand;

    async fn handle(&self, ctx: &mut Ctx, command: ConversationCommand) -> Result<(), ActorError> {
        match command {
            ConversationCommand::Initialize(init) => self.initialize(ctx, init).await,
            ConversationCommand::StartConversation => self.start(ctx).await,
            ConversationCommand::Response { text } => self.respond(ctx, text).await,
        }
    }

    /// Conversations never schedule wake-ups.
    async fn wake(&self, _ctx: &mut Ctx) -> Result<(), ActorError> {
        Ok(())
    }

    async fn on_destroy(&self, ctx: &mut Ctx) -> Result<(), ActorError> {
        let participant = ctx.state().map(|state| state.descriptor.participant_id.clone());
        if let Some(participant) = participant {
            self.release(ctx, &participant).await;
        }
        Ok(())
    }
}
