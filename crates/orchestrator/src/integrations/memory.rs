//! In-process collaborators for tests and ephemeral runs.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex;

use super::chat::{ChatClient, ChatMessage, Dialog, MessageReceipt};
use super::error::{IntegrationError, IntegrationResult};
use super::stores::{ActiveConversationIndex, ClaimOutcome, MeetingStore, ResponseLog};
use super::work_log::WorkLogClient;
use crate::domain::{
    Answer, Meeting, MeetingId, ParticipantId, ParticipantResponse, WorkLogIntegration,
};

#[derive(Debug, Default)]
pub struct InMemoryMeetingStore {
    meetings: Mutex<HashMap<MeetingId, Meeting>>,
    integrations: Mutex<HashMap<(MeetingId, ParticipantId), WorkLogIntegration>>,
}

impl InMemoryMeetingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MeetingStore for InMemoryMeetingStore {
    async fn exists(&self, id: &MeetingId) -> IntegrationResult<bool> {
        Ok(self.meetings.lock().await.contains_key(id))
    }

    async fn get(&self, id: &MeetingId) -> IntegrationResult<Option<Meeting>> {
        Ok(self.meetings.lock().await.get(id).cloned())
    }

    async fn save(&self, meeting: &Meeting) -> IntegrationResult<()> {
        self.meetings
            .lock()
            .await
            .insert(meeting.id.clone(), meeting.clone());
        Ok(())
    }

    async fn delete(&self, id: &MeetingId) -> IntegrationResult<()> {
        self.meetings.lock().await.remove(id);
        self.integrations
            .lock()
            .await
            .retain(|(meeting_id, _), _| meeting_id != id);
        Ok(())
    }

    async fn work_log_integration(
        &self,
        meeting_id: &MeetingId,
        participant_id: &ParticipantId,
    ) -> IntegrationResult<Option<WorkLogIntegration>> {
        Ok(self
            .integrations
            .lock()
            .await
            .get(&(meeting_id.clone(), participant_id.clone()))
            .cloned())
    }

    async fn set_work_log_integration(
        &self,
        meeting_id: &MeetingId,
        participant_id: &ParticipantId,
        integration: WorkLogIntegration,
    ) -> IntegrationResult<()> {
        self.integrations
            .lock()
            .await
            .insert((meeting_id.clone(), participant_id.clone()), integration);
        Ok(())
    }
}

/// One audit log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedResponse {
    pub meeting_id: MeetingId,
    pub response: ParticipantResponse,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct InMemoryResponseLog {
    entries: Mutex<Vec<LoggedResponse>>,
}

impl InMemoryResponseLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<LoggedResponse> {
        self.entries.lock().await.clone()
    }
}

#[async_trait]
impl ResponseLog for InMemoryResponseLog {
    async fn append(
        &self,
        meeting_id: &MeetingId,
        response: &ParticipantResponse,
        recorded_at: DateTime<Utc>,
    ) -> IntegrationResult<()> {
        self.entries.lock().await.push(LoggedResponse {
            meeting_id: meeting_id.clone(),
            response: response.clone(),
            recorded_at,
        });
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryActiveIndex {
    claims: Mutex<HashMap<ParticipantId, String>>,
}

impl InMemoryActiveIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActiveConversationIndex for InMemoryActiveIndex {
    async fn get(&self, participant_id: &ParticipantId) -> IntegrationResult<Option<String>> {
        Ok(self.claims.lock().await.get(participant_id).cloned())
    }

    async fn try_claim(
        &self,
        participant_id: &ParticipantId,
        conversation: &str,
    ) -> IntegrationResult<ClaimOutcome> {
        let mut claims = self.claims.lock().await;
        match claims.entry(participant_id.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(conversation.to_string());
                Ok(ClaimOutcome::Claimed)
            }
            Entry::Occupied(held) if held.get() == conversation => Ok(ClaimOutcome::Claimed),
            Entry::Occupied(held) => Ok(ClaimOutcome::Busy {
                holder: held.get().clone(),
            }),
        }
    }

    async fn release(
        &self,
        participant_id: &ParticipantId,
        conversation: &str,
    ) -> IntegrationResult<()> {
        let mut claims = self.claims.lock().await;
        if claims.get(participant_id).map(String::as_str) == Some(conversation) {
            claims.remove(participant_id);
        }
        Ok(())
    }
}

/// Everything a [`RecordingChat`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Posted {
        target: String,
        message: ChatMessage,
        message_id: String,
    },
    Deleted {
        target: String,
        message_id: String,
    },
    DialogOpened {
        participant: ParticipantId,
        dialog: Dialog,
    },
}

/// Chat client that records calls and can be told to fail posts.
#[derive(Debug, Default)]
pub struct RecordingChat {
    events: Mutex<Vec<ChatEvent>>,
    next_id: AtomicU64,
    fail_posts: AtomicBool,
}

impl RecordingChat {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent posts fail (`true`) or succeed (`false`).
    pub fn set_fail_posts(&self, fail: bool) {
        self.fail_posts.store(fail, Ordering::SeqCst);
    }

    pub async fn events(&self) -> Vec<ChatEvent> {
        self.events.lock().await.clone()
    }

    /// Texts posted to `target`, in order.
    pub async fn texts_to(&self, target: &str) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                ChatEvent::Posted {
                    target: t, message, ..
                } if t == target => Some(message.text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Ids of deleted messages, in order.
    pub async fn deleted_ids(&self) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                ChatEvent::Deleted { message_id, .. } => Some(message_id.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn dialogs(&self) -> Vec<Dialog> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|event| match event {
                ChatEvent::DialogOpened { dialog, .. } => Some(dialog.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl ChatClient for RecordingChat {
    async fn post_message(
        &self,
        target: &str,
        message: ChatMessage,
    ) -> IntegrationResult<MessageReceipt> {
        if self.fail_posts.load(Ordering::SeqCst) {
            return Err(IntegrationError::chat("channel_not_found"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let message_id = format!("msg-{id}");
        self.events.lock().await.push(ChatEvent::Posted {
            target: target.to_string(),
            message,
            message_id: message_id.clone(),
        });
        Ok(MessageReceipt { message_id })
    }

    async fn delete_message(&self, target: &str, message_id: &str) -> IntegrationResult<()> {
        self.events.lock().await.push(ChatEvent::Deleted {
            target: target.to_string(),
            message_id: message_id.to_string(),
        });
        Ok(())
    }

    async fn open_dialog(
        &self,
        participant: &ParticipantId,
        dialog: Dialog,
    ) -> IntegrationResult<()> {
        self.events.lock().await.push(ChatEvent::DialogOpened {
            participant: participant.clone(),
            dialog,
        });
        Ok(())
    }
}

/// Work-log client that records submissions and answers with a fixed reply,
/// optionally after a delay.
#[derive(Debug)]
pub struct RecordingWorkLog {
    reply: String,
    latency_ms: AtomicU64,
    submissions: Mutex<Vec<(WorkLogIntegration, Tz, Vec<Answer>)>>,
}

impl RecordingWorkLog {
    #[must_use]
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            latency_ms: AtomicU64::new(0),
            submissions: Mutex::new(Vec::new()),
        }
    }

    /// Answer every later submission only after `latency`.
    pub fn set_latency(&self, latency: Duration) {
        let millis = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        self.latency_ms.store(millis, Ordering::SeqCst);
    }

    pub async fn submissions(&self) -> Vec<(WorkLogIntegration, Tz, Vec<Answer>)> {
        self.submissions.lock().await.clone()
    }
}

#[async_trait]
impl WorkLogClient for RecordingWorkLog {
    async fn submit_work_log(
        &self,
        integration: &WorkLogIntegration,
        timezone: Tz,
        answers: &[Answer],
    ) -> IntegrationResult<String> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        self.submissions
            .lock()
            .await
            .push((integration.clone(), timezone, answers.to_vec()));
        Ok(self.reply.clone())
    }
}
