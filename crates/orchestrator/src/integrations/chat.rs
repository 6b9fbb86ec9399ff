//! Chat platform contract.
//!
//! The wire format of any particular platform is out of scope; the engine
//! talks to this trait and the binary wires [`LoggingChatClient`] unless a
//! real client is plugged in.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::IntegrationResult;
use crate::domain::ParticipantId;

/// The three choices offered on a nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NudgeAction {
    #[serde(rename = "submit_stand_up")]
    Submit,
    #[serde(rename = "skip_stand_up")]
    Skip,
    #[serde(rename = "on_leave")]
    OnLeave,
}

impl NudgeAction {
    /// Button label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Submit => "Submit",
            Self::Skip => "Skip",
            Self::OnLeave => "On leave",
        }
    }
}

/// A button attached to a message; `value` carries the meeting id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionButton {
    pub action: NudgeAction,
    pub value: String,
}

/// A message in platform-neutral form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionButton>,
}

impl ChatMessage {
    /// A plain text message.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            actions: Vec::new(),
        }
    }

    /// Attach buttons.
    #[must_use]
    pub fn with_actions(mut self, actions: Vec<ActionButton>) -> Self {
        self.actions = actions;
        self
    }
}

/// A modal shown to one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    pub title: String,
    pub text: String,
    pub close_label: String,
}

/// Handle of a posted message, used to delete it later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub message_id: String,
}

/// Outbound chat operations. `target` is a participant id (direct message)
/// or a channel id.
#[async_trait]
pub trait ChatClient: Send + Sync + fmt::Debug {
    async fn post_message(
        &self,
        target: &str,
        message: ChatMessage,
    ) -> IntegrationResult<MessageReceipt>;

    async fn delete_message(&self, target: &str, message_id: &str) -> IntegrationResult<()>;

    async fn open_dialog(&self, participant: &ParticipantId, dialog: Dialog)
    -> IntegrationResult<()>;
}

/// Chat client that only writes to the log.
#[derive(Debug, Default)]
pub struct LoggingChatClient {
    next_id: AtomicU64,
}

impl LoggingChatClient {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatClient for LoggingChatClient {
    async fn post_message(
        &self,
        target: &str,
        message: ChatMessage,
    ) -> IntegrationResult<MessageReceipt> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let message_id = format!("log-{id}");
        info!(
            target_id = %target,
            message_id = %message_id,
            actions = message.actions.len(),
            text = %message.text,
            "chat message"
        );
        Ok(MessageReceipt { message_id })
    }

    async fn delete_message(&self, target: &str, message_id: &str) -> IntegrationResult<()> {
        info!(target_id = %target, message_id = %message_id, "chat message deleted");
        Ok(())
    }

    async fn open_dialog(
        &self,
        participant: &ParticipantId,
        dialog: Dialog,
    ) -> IntegrationResult<()> {
        info!(participant_id = %participant, title = %dialog.title, text = %dialog.text, "chat dialog");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn given_nudge_action_when_serialized_then_uses_action_ids() {
        assert_eq!(
            serde_json::to_value(NudgeAction::Submit).unwrap(),
            "submit_stand_up"
        );
        assert_eq!(
            serde_json::from_value::<NudgeAction>("on_leave".into()).unwrap(),
            NudgeAction::OnLeave
        );
    }

    #[tokio::test]
    async fn given_logging_client_when_posting_then_receipts_are_unique() {
        let chat = LoggingChatClient::new();
        let a = chat.post_message("U1", ChatMessage::text("hi")).await.unwrap();
        let b = chat.post_message("U1", ChatMessage::text("hi")).await.unwrap();
        assert_ne!(a, b);
    }
}
