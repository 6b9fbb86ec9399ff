//! Every text the engine sends to participants and channels.
//!
//! Texts use chat markdown: `*bold*`, `<@user>` mentions, `<#channel>`
//! links and `>` quotes.

use std::collections::{BTreeSet, HashSet};

use chrono::NaiveDate;
use itertools::Itertools;

use crate::domain::{Answer, MeetingId, ParticipantId, ParticipantResponse, ResponseKind};
use crate::integrations::{ActionButton, ChatMessage, Dialog, NudgeAction};

fn mention(participant: &ParticipantId) -> String {
    format!("<@{participant}>")
}

fn mention_list(participants: &[ParticipantId]) -> String {
    participants.iter().map(mention).join(", ")
}

/// Sent once when a participant joins a meeting.
#[must_use]
pub fn onboarding(meeting_name: &str, channel: &str, stand_up_at: &str, lead_minutes: u32) -> ChatMessage {
    ChatMessage::text(format!(
        ":wave: Hello there! You have been invited to participate in the *{meeting_name} team's daily standup meeting* :raised_hands:. \
         The purpose of this meeting is to help team members stay informed about each other's work and to identify any obstacles or challenges that need to be addressed. :rocket:\n\n\
         The standup will take place in the *<#{channel}>* channel at {stand_up_at}. \
         Every day, {lead_minutes} minutes before the standup, I will prompt you to share your updates and to report any issues or blockers you may have encountered. :raised_hands:\n\n\
         If you have any questions or concerns, please reach out to the {meeting_name} team's lead. Thank you! :pray:"
    ))
}

/// The reminder with Submit / Skip / On leave buttons.
#[must_use]
pub fn nudge(participant: &ParticipantId, meeting_id: &MeetingId) -> ChatMessage {
    let actions = [NudgeAction::Submit, NudgeAction::Skip, NudgeAction::OnLeave]
        .into_iter()
        .map(|action| ActionButton {
            action,
            value: meeting_id.as_str().to_string(),
        })
        .collect();

    ChatMessage::text(format!(
        "👋 Hey {}! It's time for your stand up!",
        mention(participant)
    ))
    .with_actions(actions)
}

/// Sent when a nudge went unanswered for the whole escalation window.
#[must_use]
pub fn missed(participant: &ParticipantId, meeting_name: &str) -> ChatMessage {
    ChatMessage::text(format!(
        ":hourglass: {}, you missed today's *{meeting_name}* stand up. I'll check in again at the next one.",
        mention(participant)
    ))
}

/// Shown when the participant is already answering another stand-up.
#[must_use]
pub fn busy_dialog() -> Dialog {
    Dialog {
        title: "Stand-up".to_string(),
        text: ":warning: Please *complete your current on-going standup update :writing_hand:* before starting this one to avoid ambiguity in your submission.".to_string(),
        close_label: "OK, got it!".to_string(),
    }
}

/// One prompt of the conversation.
#[must_use]
pub fn question(text: &str) -> ChatMessage {
    ChatMessage::text(text)
}

/// Sent once all answers are in.
#[must_use]
pub fn acknowledgement() -> ChatMessage {
    ChatMessage::text("Your response has been recorded :tada:")
}

fn answers_text(answers: &[Answer]) -> String {
    answers
        .iter()
        .map(|a| format!("- {} \n> {}", a.question, a.answer.split('\n').join("\n> ")))
        .join("\n")
}

/// A response that arrived after the brief was published.
#[must_use]
pub fn late_response(response: &ParticipantResponse) -> ChatMessage {
    let who = mention(&response.participant_id);
    let text = match &response.response {
        ResponseKind::Submitted { answers } => format!(
            ":tada: *{who}* has submitted their stand up!\n\n{}\n\nGreat job, keep up the good work! 🙌",
            answers_text(answers)
        ),
        ResponseKind::Skipped => format!(
            ":warning: *{who}* has skipped today's stand up.\n\n\
             We understand that sometimes schedules can be unpredictable, but regular stand-up updates are an important part of our team's communication. Please try to attend the next one, *{who}*!"
        ),
        ResponseKind::OnLeave => format!(
            ":beach_with_umbrella: *{who}* is on leave.\n\n\
             Enjoy your well-deserved break, *{who}*! We'll catch up with you when you're back."
        ),
    };
    ChatMessage::text(text)
}

/// Responses of one cycle split by kind, against the full participant set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BriefSummary {
    pub submitted: Vec<(ParticipantId, Vec<Answer>)>,
    pub skipped: Vec<ParticipantId>,
    pub on_leave: Vec<ParticipantId>,
    pub no_response: Vec<ParticipantId>,
}

impl BriefSummary {
    /// Partition `responses`; every participant without one is "no response".
    #[must_use]
    pub fn partition(participants: &BTreeSet<ParticipantId>, responses: &[ParticipantResponse]) -> Self {
        let mut summary = Self::default();
        let mut responded = HashSet::new();

        for response in responses {
            responded.insert(&response.participant_id);
            let who = response.participant_id.clone();
            match &response.response {
                ResponseKind::Submitted { answers } => summary.submitted.push((who, answers.clone())),
                ResponseKind::Skipped => summary.skipped.push(who),
                ResponseKind::OnLeave => summary.on_leave.push(who),
            }
        }

        summary.no_response = participants
            .iter()
            .filter(|p| !responded.contains(p))
            .cloned()
            .collect();
        summary
    }

    /// Participants with any response.
    #[must_use]
    pub fn responded(&self) -> usize {
        self.submitted
            .len()
            .saturating_add(self.skipped.len())
            .saturating_add(self.on_leave.len())
    }
}

/// The consolidated channel post for one cycle.
#[must_use]
pub fn brief(date: NaiveDate, summary: &BriefSummary) -> ChatMessage {
    let header = format!("Standup Update for *{}*", date.format("%b %-d, %Y"));

    let submissions = summary
        .submitted
        .iter()
        .map(|(who, answers)| format!("*{}*\n{}", mention(who), answers_text(answers)));

    let or_no_one = |list: &[ParticipantId]| {
        if list.is_empty() {
            "No one".to_string()
        } else {
            mention_list(list)
        }
    };
    let absences = format!(
        "{} skipped today's stand up & {} are on holidays",
        or_no_one(&summary.skipped),
        or_no_one(&summary.on_leave)
    );

    let silence = if summary.no_response.is_empty() {
        "Everyone has responded! Keep up your good work, team! :rocket:".to_string()
    } else {
        format!(
            "I didn't hear from {}! Keep up your good work, team! :rocket:",
            mention_list(&summary.no_response)
        )
    };

    let text = std::iter::once(header)
        .chain(submissions)
        .chain([absences, silence])
        .join("\n\n");
    ChatMessage::text(text)
}
