//! Shared environment of the actor triad.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use super::brief::Brief;
use super::conversation::Conversation;
use super::directory::{ActorDirectory, ActorHandle};
use super::durable::Behavior;
use super::errors::ActorError;
use super::reminder::Reminder;
use crate::clock::Clock;
use crate::config::ScheduleSettings;
use crate::domain::MeetingId;
use crate::integrations::Integrations;
use crate::persistence::StateStore;

/// Collaborators, clock, settings and the three actor directories.
pub struct ActorRuntime {
    integrations: Integrations,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    settings: ScheduleSettings,
    reminders: ActorDirectory<Reminder>,
    conversations: ActorDirectory<Conversation>,
    briefs: ActorDirectory<Brief>,
}

impl fmt::Debug for ActorRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRuntime")
            .field("store", &self.store)
            .field("clock", &self.clock)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ActorRuntime {
    #[must_use]
    pub fn new(
        integrations: Integrations,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
        settings: ScheduleSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            integrations,
            store,
            clock,
            settings,
            reminders: ActorDirectory::new(),
            conversations: ActorDirectory::new(),
            briefs: ActorDirectory::new(),
        })
    }

    #[must_use]
    pub fn integrations(&self) -> &Integrations {
        &self.integrations
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    #[must_use]
    pub fn settings(&self) -> &ScheduleSettings {
        &self.settings
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Reminder actor named by [`participant_actor_name`](crate::domain::participant_actor_name).
    ///
    /// # Errors
    ///
    /// Returns `SpawnFailed` if the actor cannot be loaded.
    pub async fn reminder(self: &Arc<Self>, name: &str) -> Result<ActorHandle<Reminder>, ActorError> {
        self.reminders.resolve(name, self).await
    }

    /// Conversation actor named by [`participant_actor_name`](crate::domain::participant_actor_name).
    ///
    /// # Errors
    ///
    /// Returns `SpawnFailed` if the actor cannot be loaded.
    pub async fn conversation(
        self: &Arc<Self>,
        name: &str,
    ) -> Result<ActorHandle<Conversation>, ActorError> {
        self.conversations.resolve(name, self).await
    }

    /// Brief actor of a meeting.
    ///
    /// # Errors
    ///
    /// Returns `SpawnFailed` if the actor cannot be loaded.
    pub async fn brief(self: &Arc<Self>, meeting_id: &MeetingId) -> Result<ActorHandle<Brief>, ActorError> {
        self.briefs.resolve(meeting_id.as_str(), self).await
    }

    /// # Errors
    ///
    /// See [`ActorDirectory::destroy`].
    pub async fn destroy_reminder(self: &Arc<Self>, name: &str) -> Result<(), ActorError> {
        self.reminders.destroy(name, self).await
    }

    /// # Errors
    ///
    /// See [`ActorDirectory::destroy`].
    pub async fn destroy_conversation(self: &Arc<Self>, name: &str) -> Result<(), ActorError> {
        self.conversations.destroy(name, self).await
    }

    /// # Errors
    ///
    /// See [`ActorDirectory::destroy`].
    pub async fn destroy_brief(self: &Arc<Self>, meeting_id: &MeetingId) -> Result<(), ActorError> {
        self.briefs.destroy(meeting_id.as_str(), self).await
    }

    /// Load every actor that has a pending wake-up so its timer is armed
    /// again after a restart. Returns how many actors were loaded.
    ///
    /// # Errors
    ///
    /// Returns `Persistence` if the store cannot be listed, or `SpawnFailed`.
    pub async fn recover(self: &Arc<Self>) -> Result<usize, ActorError> {
        let reminders = self.store.scheduled(Reminder::KIND).await?;
        let conversations = self.store.scheduled(Conversation::KIND).await?;
        let briefs = self.store.scheduled(Brief::KIND).await?;

        for name in &reminders {
            self.reminders.resolve(name, self).await?;
        }
        for name in &conversations {
            self.conversations.resolve(name, self).await?;
        }
        for name in &briefs {
            self.briefs.resolve(name, self).await?;
        }

        let recovered = reminders
            .len()
            .saturating_add(conversations.len())
            .saturating_add(briefs.len());
        info!(
            reminders = reminders.len(),
            conversations = conversations.len(),
            briefs = briefs.len(),
            "Scheduled actors recovered"
        );
        Ok(recovered)
    }

    /// Live actors per kind: (reminders, conversations, briefs).
    pub async fn live_counts(&self) -> (usize, usize, usize) {
        (
            self.reminders.live_count().await,
            self.conversations.live_count().await,
            self.briefs.live_count().await,
        )
    }

    /// Stop every actor. Persisted state and wake-ups survive for the next
    /// start.
    pub async fn shutdown(&self) {
        self.reminders.shutdown().await;
        self.conversations.shutdown().await;
        self.briefs.shutdown().await;
    }
}
