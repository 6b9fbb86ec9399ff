//! Shared harness for the actor scenario tests.
//!
//! Every harness runs on paused tokio time with an [`AnchoredClock`], so
//! advancing tokio's clock fires hour-scale wake-ups immediately and the
//! actors see the matching wall-clock instant.

#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, TimeZone, Utc};

use standup_orchestrator::actors::ActorRuntime;
use standup_orchestrator::clock::{AnchoredClock, Clock};
use standup_orchestrator::config::ScheduleSettings;
use standup_orchestrator::domain::{Frequency, Meeting, MeetingId, ParticipantId, Question};
use standup_orchestrator::integrations::{
    InMemoryActiveIndex, InMemoryMeetingStore, InMemoryResponseLog, Integrations, RecordingChat,
    RecordingWorkLog,
};
use standup_orchestrator::orchestrator::MeetingOrchestrator;
use standup_orchestrator::persistence::InMemoryStateStore;

/// The runtime plus typed handles on every in-memory collaborator.
pub struct Harness {
    pub runtime: Arc<ActorRuntime>,
    pub orchestrator: MeetingOrchestrator,
    pub chat: Arc<RecordingChat>,
    pub work_log: Arc<RecordingWorkLog>,
    pub meetings: Arc<InMemoryMeetingStore>,
    pub responses: Arc<InMemoryResponseLog>,
    pub active: Arc<InMemoryActiveIndex>,
    pub store: Arc<InMemoryStateStore>,
    pub clock: Arc<AnchoredClock>,
    pub settings: ScheduleSettings,
}

impl Harness {
    /// A fresh harness whose clock reads `anchor`.
    pub fn start_at(anchor: DateTime<Utc>) -> Self {
        Self::with_settings(anchor, ScheduleSettings::default())
    }

    pub fn with_settings(anchor: DateTime<Utc>, settings: ScheduleSettings) -> Self {
        init_tracing();
        let chat = Arc::new(RecordingChat::new());
        let work_log = Arc::new(RecordingWorkLog::new("Work logged: 2 entries"));
        let meetings = Arc::new(InMemoryMeetingStore::new());
        let responses = Arc::new(InMemoryResponseLog::new());
        let active = Arc::new(InMemoryActiveIndex::new());
        let store = Arc::new(InMemoryStateStore::new());
        let clock = Arc::new(AnchoredClock::new(anchor));

        let runtime = Self::build_runtime(
            &chat, &work_log, &meetings, &responses, &active, &store, &clock, settings,
        );
        Self {
            orchestrator: MeetingOrchestrator::new(Arc::clone(&runtime)),
            runtime,
            chat,
            work_log,
            meetings,
            responses,
            active,
            store,
            clock,
            settings,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn build_runtime(
        chat: &Arc<RecordingChat>,
        work_log: &Arc<RecordingWorkLog>,
        meetings: &Arc<InMemoryMeetingStore>,
        responses: &Arc<InMemoryResponseLog>,
        active: &Arc<InMemoryActiveIndex>,
        store: &Arc<InMemoryStateStore>,
        clock: &Arc<AnchoredClock>,
        settings: ScheduleSettings,
    ) -> Arc<ActorRuntime> {
        let integrations = Integrations {
            chat: chat.clone(),
            work_log: work_log.clone(),
            meetings: meetings.clone(),
            responses: responses.clone(),
            active: active.clone(),
        };
        ActorRuntime::new(integrations, store.clone(), clock.clone(), settings)
    }

    /// Simulate a process restart: stop every actor, build a new runtime over
    /// the same stores and clock, and reload the scheduled actors.
    pub async fn restart(self) -> Self {
        self.runtime.shutdown().await;
        settle().await;

        let runtime = Self::build_runtime(
            &self.chat,
            &self.work_log,
            &self.meetings,
            &self.responses,
            &self.active,
            &self.store,
            &self.clock,
            self.settings,
        );
        runtime.recover().await.expect("recover scheduled actors");
        Self {
            orchestrator: MeetingOrchestrator::new(Arc::clone(&runtime)),
            runtime,
            ..self
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Move time forward to `at` and let every actor catch up.
    pub async fn advance_to(&self, at: DateTime<Utc>) {
        let delta = at
            .signed_duration_since(self.clock.now())
            .to_std()
            .unwrap_or(Duration::ZERO);
        tokio::time::advance(delta).await;
        settle().await;
    }

    pub async fn advance(&self, delta: chrono::Duration) {
        self.advance_to(self.now() + delta).await;
    }

    pub async fn shutdown(&self) {
        self.runtime.shutdown().await;
    }
}

/// Run every ready task until the runtime is idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("standup_orchestrator=debug")
        .try_init();
}

/// Wall-clock instant in Asia/Kolkata.
pub fn ist(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    chrono_tz::Asia::Kolkata
        .with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("unambiguous IST instant")
        .with_timezone(&Utc)
}

pub fn p(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}

/// Weekday 10:30 Asia/Kolkata stand-up with two questions.
pub fn meeting(id: &str, participants: &[&str]) -> Meeting {
    Meeting {
        id: MeetingId::new(id),
        owner: "U-owner".to_string(),
        name: "Platform".to_string(),
        channel: "C-platform".to_string(),
        questions: vec![
            Question {
                id: "yesterday".to_string(),
                text: "What did you do yesterday?".to_string(),
            },
            Question {
                id: "today".to_string(),
                text: "What will you do today?".to_string(),
            },
        ],
        frequency: Frequency::Weekdays,
        time: NaiveTime::from_hms_opt(10, 30, 0).expect("valid time"),
        timezone: chrono_tz::Asia::Kolkata,
        participants: participants.iter().map(|id| p(id)).collect::<BTreeSet<_>>(),
    }
}
