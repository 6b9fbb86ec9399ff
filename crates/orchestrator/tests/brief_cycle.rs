//! BDD-style behavioral tests for the Brief actor's daily cycle.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

mod common;

use chrono::{DateTime, Utc};

use common::{Harness, ist, meeting, p, settle};
use standup_orchestrator::actors::{BriefCommand, BriefPhase, BriefState};
use standup_orchestrator::domain::{Answer, MeetingId, ParticipantResponse, ResponseKind};
use standup_orchestrator::integrations::MeetingStore;

async fn brief_snapshot(h: &Harness) -> (BriefState, Option<DateTime<Utc>>) {
    let snapshot = h
        .runtime
        .brief(&MeetingId::new("m1"))
        .await
        .unwrap()
        .snapshot()
        .await
        .unwrap();
    (snapshot.state.expect("brief initialized"), snapshot.wake_at)
}

fn answer(question: &str, text: &str) -> Answer {
    Answer {
        question_id: question.to_lowercase(),
        question: question.to_string(),
        answer: text.to_string(),
    }
}

/// Monday 09:00 IST with U1, U2 and U3 in meeting `m1`.
async fn harness_with_team() -> Harness {
    let h = Harness::start_at(ist(2024, 3, 4, 9, 0));
    h.orchestrator
        .create_meeting(meeting("m1", &["U1", "U2", "U3"]))
        .await
        .unwrap();
    settle().await;
    h
}

async fn record(h: &Harness, response: ParticipantResponse) {
    h.runtime
        .brief(&MeetingId::new("m1"))
        .await
        .unwrap()
        .send(BriefCommand::RecordResponse(response))
        .unwrap();
    settle().await;
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACCUMULATION BEHAVIORS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn given_new_meeting_when_brief_initialized_then_waits_for_stand_up_time() {
    let h = harness_with_team().await;

    let (state, wake_at) = brief_snapshot(&h).await;

    assert_eq!(state.phase, BriefPhase::Accumulating);
    assert_eq!(state.descriptor.next_brief_at, ist(2024, 3, 4, 10, 30));
    assert_eq!(wake_at, Some(ist(2024, 3, 4, 10, 30)));
    assert_eq!(state.descriptor.participant_ids.len(), 3);
    assert!(state.pending_responses.is_empty());
    assert!(h.store.contains("brief", "m1").await);
    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_skip_and_leave_when_pressed_then_buffered_and_audited() {
    let h = harness_with_team().await;
    let m1 = MeetingId::new("m1");

    h.orchestrator.skip(&m1, &p("U2")).await.unwrap();
    h.orchestrator.on_leave(&m1, &p("U3")).await.unwrap();
    settle().await;

    let (state, _) = brief_snapshot(&h).await;
    assert_eq!(
        state.pending_responses,
        vec![
            ParticipantResponse::skipped(p("U2")),
            ParticipantResponse::on_leave(p("U3")),
        ]
    );
    let audit = h.responses.entries().await;
    assert_eq!(audit.len(), 2);
    assert!(audit.iter().all(|entry| entry.meeting_id == m1));
    assert_eq!(audit[0].recorded_at, ist(2024, 3, 4, 9, 0));
    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_second_response_from_same_participant_then_it_replaces_the_first() {
    let h = harness_with_team().await;

    record(&h, ParticipantResponse::skipped(p("U1"))).await;
    record(
        &h,
        ParticipantResponse::submitted(p("U1"), vec![answer("Yesterday?", "Shipped")]),
    )
    .await;

    // Then: One buffered record, but both are in the audit log
    let (state, _) = brief_snapshot(&h).await;
    assert_eq!(state.pending_responses.len(), 1);
    assert!(matches!(
        state.pending_responses[0].response,
        ResponseKind::Submitted { .. }
    ));
    assert_eq!(h.responses.entries().await.len(), 2);
    h.shutdown().await;
}

// ═══════════════════════════════════════════════════════════════════════════════
// PUBLISH BEHAVIORS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn given_mixed_responses_when_stand_up_time_arrives_then_summary_posted() {
    let h = harness_with_team().await;
    record(
        &h,
        ParticipantResponse::submitted(p("U1"), vec![answer("Yesterday?", "Fixed bugs")]),
    )
    .await;
    record(&h, ParticipantResponse::skipped(p("U2"))).await;

    // When: 10:30 IST arrives
    h.advance_to(ist(2024, 3, 4, 10, 30)).await;

    // Then: One summary in the channel
    let posts = h.chat.texts_to("C-platform").await;
    assert_eq!(posts.len(), 1);
    let brief = &posts[0];
    assert!(brief.starts_with("Standup Update for *Mar 4, 2024*"));
    assert!(brief.contains("*<@U1>*\n- Yesterday? \n> Fixed bugs"));
    assert!(brief.contains("<@U2> skipped today's stand up & No one are on holidays"));
    assert!(brief.ends_with("I didn't hear from <@U3>! Keep up your good work, team! :rocket:"));

    // And: The brief is published with an empty buffer, resetting eight hours later
    let (state, wake_at) = brief_snapshot(&h).await;
    assert_eq!(state.phase, BriefPhase::Published);
    assert!(state.pending_responses.is_empty());
    assert_eq!(wake_at, Some(ist(2024, 3, 4, 18, 30)));
    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_everyone_responded_when_published_then_summary_says_so() {
    let h = harness_with_team().await;
    for id in ["U1", "U2", "U3"] {
        record(&h, ParticipantResponse::on_leave(p(id))).await;
    }

    h.advance_to(ist(2024, 3, 4, 10, 30)).await;

    let posts = h.chat.texts_to("C-platform").await;
    assert_eq!(posts.len(), 1);
    assert!(posts[0].contains("No one skipped today's stand up & <@U1>, <@U2>, <@U3> are on holidays"));
    assert!(posts[0].ends_with("Everyone has responded! Keep up your good work, team! :rocket:"));
    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_published_brief_when_late_response_arrives_then_posted_on_its_own() {
    let h = harness_with_team().await;
    h.advance_to(ist(2024, 3, 4, 10, 30)).await;

    // When: U3 skips after the summary went out
    h.orchestrator
        .skip(&MeetingId::new("m1"), &p("U3"))
        .await
        .unwrap();
    settle().await;

    // Then: A standalone notice follows the summary
    let posts = h.chat.texts_to("C-platform").await;
    assert_eq!(posts.len(), 2);
    assert!(posts[1].starts_with(":warning: *<@U3>* has skipped today's stand up."));

    // And: Nothing is buffered for tomorrow
    let (state, _) = brief_snapshot(&h).await;
    assert!(state.pending_responses.is_empty());
    assert_eq!(h.responses.entries().await.len(), 1);
    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_published_brief_when_grace_period_ends_then_next_cycle_starts() {
    let h = harness_with_team().await;
    h.advance_to(ist(2024, 3, 4, 10, 30)).await;

    // When: Eight hours pass
    h.advance_to(ist(2024, 3, 4, 18, 30)).await;

    // Then: Accumulating again for Tuesday's stand-up
    let (state, wake_at) = brief_snapshot(&h).await;
    assert_eq!(state.phase, BriefPhase::Accumulating);
    assert_eq!(state.descriptor.next_brief_at, ist(2024, 3, 5, 10, 30));
    assert_eq!(wake_at, Some(ist(2024, 3, 5, 10, 30)));

    // And: A response now counts towards Tuesday
    record(&h, ParticipantResponse::skipped(p("U1"))).await;
    let (state, _) = brief_snapshot(&h).await;
    assert_eq!(state.pending_responses.len(), 1);
    assert_eq!(h.chat.texts_to("C-platform").await.len(), 1);
    h.shutdown().await;
}

// ═══════════════════════════════════════════════════════════════════════════════
// MEMBERSHIP AND ORPHAN BEHAVIORS
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn given_removed_participant_when_published_then_not_listed() {
    let h = harness_with_team().await;
    let m1 = MeetingId::new("m1");
    h.orchestrator.skip(&m1, &p("U3")).await.unwrap();
    settle().await;

    h.orchestrator
        .remove_participants(&m1, vec![p("U3")])
        .await
        .unwrap();
    settle().await;
    h.advance_to(ist(2024, 3, 4, 10, 30)).await;

    let posts = h.chat.texts_to("C-platform").await;
    assert!(!posts[0].contains("U3"));
    assert!(posts[0].ends_with("I didn't hear from <@U1>, <@U2>! Keep up your good work, team! :rocket:"));
    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_uninitialized_brief_when_response_arrives_then_brief_destroys_itself() {
    let h = Harness::start_at(ist(2024, 3, 4, 9, 0));
    let brief = h.runtime.brief(&MeetingId::new("gone")).await.unwrap();

    brief
        .send(BriefCommand::RecordResponse(ParticipantResponse::skipped(p("U1"))))
        .unwrap();
    settle().await;

    let (_, _, briefs) = h.runtime.live_counts().await;
    assert_eq!(briefs, 0);
    assert!(!h.store.contains("brief", "gone").await);
    assert!(h.responses.entries().await.is_empty());
    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_uninitialized_brief_when_membership_changes_then_nothing_persisted() {
    let h = Harness::start_at(ist(2024, 3, 4, 9, 0));
    let brief = h.runtime.brief(&MeetingId::new("ghost")).await.unwrap();

    brief
        .send(BriefCommand::AddParticipants {
            participant_ids: vec![p("U1")],
        })
        .unwrap();
    brief
        .send(BriefCommand::RemoveParticipants {
            participant_ids: vec![p("U1")],
        })
        .unwrap();
    settle().await;

    assert!(brief.snapshot().await.unwrap().state.is_none());
    assert!(!h.store.contains("brief", "ghost").await);
    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_deleted_meeting_when_brief_wakes_then_nothing_posted() {
    let h = harness_with_team().await;
    h.meetings.delete(&MeetingId::new("m1")).await.unwrap();
    h.chat.clear().await;

    h.advance_to(ist(2024, 3, 4, 10, 30)).await;

    assert!(h.chat.texts_to("C-platform").await.is_empty());
    assert!(!h.store.contains("brief", "m1").await);
    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_restart_with_buffered_responses_when_published_then_nothing_lost() {
    let h = harness_with_team().await;
    record(&h, ParticipantResponse::skipped(p("U2"))).await;

    let h = h.restart().await;
    h.advance_to(ist(2024, 3, 4, 10, 30)).await;

    let posts = h.chat.texts_to("C-platform").await;
    assert_eq!(posts.len(), 1);
    assert!(posts[0].contains("<@U2> skipped today's stand up"));
    h.shutdown().await;
}
