//! Stand-up domain types shared by the actors, the orchestrator and the API.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Opaque meeting identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeetingId(String);

impl MeetingId {
    /// Wrap a raw id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque participant identity (a chat user id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wrap a raw id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable name of the Reminder and Conversation actors for one participant.
///
/// The participant part never contains `-` (it is percent-escaped), so the
/// last `-` always separates the two ids and distinct pairs never share a
/// name.
#[must_use]
pub fn participant_actor_name(meeting_id: &MeetingId, participant_id: &ParticipantId) -> String {
    let participant = participant_id
        .as_str()
        .replace('%', "%25")
        .replace('-', "%2D");
    format!("{meeting_id}-{participant}")
}

/// Which weekdays a meeting runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    /// Monday through Sunday.
    EveryDay,
    /// Monday through Friday.
    Weekdays,
    /// Monday through Saturday.
    SixDayWeek,
}

impl Frequency {
    /// Whether the meeting runs on `weekday`.
    #[must_use]
    pub fn is_valid_day(self, weekday: Weekday) -> bool {
        let day = weekday.number_from_monday();
        match self {
            Self::EveryDay => true,
            Self::Weekdays => day <= 5,
            Self::SixDayWeek => day <= 6,
        }
    }
}

/// One prompt of a stand-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
}

/// A recurring stand-up configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    pub owner: String,
    pub name: String,
    pub channel: String,
    pub questions: Vec<Question>,
    pub frequency: Frequency,
    #[serde(with = "time_of_day")]
    pub time: NaiveTime,
    pub timezone: Tz,
    #[serde(default)]
    pub participants: BTreeSet<ParticipantId>,
}

impl Meeting {
    /// Check the invariants the actors rely on.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMeeting` if the name, channel or question list is empty.
    pub fn validate(&self) -> standup_core::Result<()> {
        if self.name.trim().is_empty() {
            return Err(standup_core::Error::invalid_meeting("name must not be empty"));
        }
        if self.channel.trim().is_empty() {
            return Err(standup_core::Error::invalid_meeting(
                "channel must not be empty",
            ));
        }
        if self.questions.is_empty() {
            return Err(standup_core::Error::invalid_meeting(
                "at least one question is required",
            ));
        }
        Ok(())
    }

    /// Human label of the stand-up time, e.g. `10:30 AM`.
    #[must_use]
    pub fn stand_up_at_label(&self) -> String {
        self.time.format("%-I:%M %p").to_string()
    }
}

/// One recorded answer, carrying the question text so the summary is
/// self-contained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: String,
    pub question: String,
    pub answer: String,
}

/// What a participant did for one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseKind {
    Submitted { answers: Vec<Answer> },
    Skipped,
    OnLeave,
}

/// A response record, tagged with the participant it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantResponse {
    pub participant_id: ParticipantId,
    pub response: ResponseKind,
}

impl ParticipantResponse {
    #[must_use]
    pub fn submitted(participant_id: ParticipantId, answers: Vec<Answer>) -> Self {
        Self {
            participant_id,
            response: ResponseKind::Submitted { answers },
        }
    }

    #[must_use]
    pub fn skipped(participant_id: ParticipantId) -> Self {
        Self {
            participant_id,
            response: ResponseKind::Skipped,
        }
    }

    #[must_use]
    pub fn on_leave(participant_id: ParticipantId) -> Self {
        Self {
            participant_id,
            response: ResponseKind::OnLeave,
        }
    }
}

/// Issue-tracker credentials for a participant's work-log integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkLogIntegration {
    pub project_id: String,
    pub api_token: String,
}

/// Serde adapter for `HH:MM` (or `HH:MM:SS`) local times.
pub mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Parse `HH:MM` or `HH:MM:SS`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTimeOfDay` if neither format matches.
    pub fn parse(value: &str) -> standup_core::Result<NaiveTime> {
        NaiveTime::parse_from_str(value, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
            .map_err(|e| standup_core::Error::invalid_time_of_day(value, e.to_string()))
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn meeting() -> Meeting {
        Meeting {
            id: MeetingId::new("m1"),
            owner: "U-owner".into(),
            name: "Platform".into(),
            channel: "C-platform".into(),
            questions: vec![Question {
                id: "q1".into(),
                text: "What did you do yesterday?".into(),
            }],
            frequency: Frequency::Weekdays,
            time: NaiveTime::from_hms_opt(10, 30, 0).unwrap(),
            timezone: chrono_tz::Asia::Kolkata,
            participants: BTreeSet::new(),
        }
    }

    #[test]
    fn given_frequencies_when_checking_weekend_then_only_matching_days_valid() {
        assert!(Frequency::EveryDay.is_valid_day(Weekday::Sun));
        assert!(Frequency::SixDayWeek.is_valid_day(Weekday::Sat));
        assert!(!Frequency::SixDayWeek.is_valid_day(Weekday::Sun));
        assert!(Frequency::Weekdays.is_valid_day(Weekday::Fri));
        assert!(!Frequency::Weekdays.is_valid_day(Weekday::Sat));
    }

    #[test]
    fn given_meeting_json_when_parsed_then_time_and_timezone_round_trip() {
        let json = serde_json::to_value(meeting()).unwrap();
        assert_eq!(json["time"], "10:30");
        assert_eq!(json["timezone"], "Asia/Kolkata");
        assert_eq!(json["frequency"], "weekdays");

        let parsed: Meeting = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, meeting());
    }

    #[test]
    fn given_no_questions_when_validated_then_invalid_meeting() {
        let mut m = meeting();
        m.questions.clear();
        assert!(matches!(
            m.validate(),
            Err(standup_core::Error::InvalidMeeting { .. })
        ));
    }

    #[test]
    fn given_bad_time_when_parsed_then_invalid_time_of_day() {
        assert!(time_of_day::parse("25:99").is_err());
        assert_eq!(
            time_of_day::parse("07:05:00").unwrap(),
            NaiveTime::from_hms_opt(7, 5, 0).unwrap()
        );
    }

    #[test]
    fn given_meeting_when_labelled_then_twelve_hour_clock() {
        assert_eq!(meeting().stand_up_at_label(), "10:30 AM");
    }

    #[test]
    fn given_plain_ids_when_named_then_meeting_dash_participant() {
        let name = participant_actor_name(&MeetingId::new("m1"), &ParticipantId::new("U1"));
        assert_eq!(name, "m1-U1");
    }

    #[test]
    fn given_dashes_in_either_id_when_named_then_pairs_stay_distinct() {
        let first = participant_actor_name(&MeetingId::new("a"), &ParticipantId::new("b-c"));
        let second = participant_actor_name(&MeetingId::new("a-b"), &ParticipantId::new("c"));
        let third = participant_actor_name(&MeetingId::new("a"), &ParticipantId::new("b%2Dc"));

        assert_eq!(first, "a-b%2Dc");
        assert_eq!(second, "a-b-c");
        assert_eq!(third, "a-b%252Dc");
    }

    #[test]
    fn given_response_when_serialized_then_kind_tagged() {
        let json = serde_json::to_value(ParticipantResponse::on_leave(ParticipantId::new("U1")))
            .unwrap();
        assert_eq!(json["participant_id"], "U1");
        assert_eq!(json["response"]["kind"], "on_leave");
    }
}
