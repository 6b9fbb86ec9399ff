//! Property-based tests for occurrence computation.
//!
//! Uses proptest to validate, for any instant, time zone and frequency:
//! - The next occurrence is strictly in the future
//! - It falls on a day the frequency allows
//! - It is never more than a week and a day away
//! - It lands on the requested local time (or one hour later inside a DST gap)
//! - No valid day in between would have given an earlier instant
//! - A reminder lead is subtracted from the occurrence, not from the day filter

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use chrono::{DateTime, Datelike, NaiveTime, Utc};
use chrono_tz::Tz;
use proptest::prelude::*;

use standup_orchestrator::domain::Frequency;
use standup_orchestrator::schedule::{
    next_occurrence, next_valid_occurrence, next_valid_occurrence_with_lead, resolve_local,
};

const ZONES: [Tz; 6] = [
    chrono_tz::UTC,
    chrono_tz::Asia::Kolkata,
    chrono_tz::America::New_York,
    chrono_tz::Europe::London,
    chrono_tz::Australia::Sydney,
    chrono_tz::Pacific::Chatham,
];

fn frequency() -> impl Strategy<Value = Frequency> {
    prop_oneof![
        Just(Frequency::EveryDay),
        Just(Frequency::Weekdays),
        Just(Frequency::SixDayWeek),
    ]
}

fn zone() -> impl Strategy<Value = Tz> {
    (0..ZONES.len()).prop_map(|i| ZONES.get(i).copied().unwrap_or(chrono_tz::UTC))
}

fn instant() -> impl Strategy<Value = DateTime<Utc>> {
    // 2020-01-01 .. 2030-01-01
    (1_577_836_800_i64..1_893_456_000_i64)
        .prop_map(|secs| DateTime::from_timestamp(secs, 0).unwrap_or_default())
}

fn time_of_day() -> impl Strategy<Value = NaiveTime> {
    (0u32..24, 0u32..60).prop_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default())
}

proptest! {
    #[test]
    fn prop_next_valid_occurrence_is_future_valid_and_near(
        now in instant(),
        tz in zone(),
        time in time_of_day(),
        frequency in frequency(),
    ) {
        let next = next_valid_occurrence(now, tz, time, frequency);
        prop_assert!(next.is_some(), "no occurrence found");
        let Some(next) = next else { return Ok(()); };

        prop_assert!(next > now);
        prop_assert!(next - now <= chrono::Duration::days(8));

        let local = next.with_timezone(&tz);
        prop_assert!(frequency.is_valid_day(local.weekday()), "{local} not valid for {frequency:?}");

        let shifted = time.overflowing_add_signed(chrono::Duration::hours(1)).0;
        prop_assert!(
            local.time() == time || local.time() == shifted,
            "local time {} for requested {}", local.time(), time
        );

        let today = now.with_timezone(&tz).date_naive();
        for date in today.iter_days().take_while(|date| *date <= local.date_naive()) {
            if !frequency.is_valid_day(date.weekday()) {
                continue;
            }
            if let Some(candidate) = resolve_local(tz, date, time) {
                prop_assert!(
                    candidate <= now || candidate >= next,
                    "{candidate} on {date} lies between {now} and {next}"
                );
            }
        }
    }

    #[test]
    fn prop_next_occurrence_is_within_a_day(
        now in instant(),
        tz in zone(),
        time in time_of_day(),
    ) {
        let next = next_occurrence(now, tz, time);
        prop_assert!(next.is_some());
        let Some(next) = next else { return Ok(()); };

        prop_assert!(next > now);
        // A DST transition can stretch the local day to 25 hours.
        prop_assert!(next - now <= chrono::Duration::hours(26));
    }

    #[test]
    fn prop_lead_precedes_an_occurrence_on_a_valid_day(
        now in instant(),
        tz in zone(),
        time in time_of_day(),
        frequency in frequency(),
        lead_minutes in 0i64..=180,
    ) {
        let lead = chrono::Duration::minutes(lead_minutes);
        let at = next_valid_occurrence_with_lead(now, tz, time, lead, frequency);
        prop_assert!(at.is_some());
        let Some(at) = at else { return Ok(()); };

        prop_assert!(at > now);
        let stand_up = (at + lead).with_timezone(&tz);
        prop_assert!(
            frequency.is_valid_day(stand_up.weekday()),
            "{stand_up} not valid for {frequency:?}"
        );

        let today = now.with_timezone(&tz).date_naive();
        for date in today.iter_days().take_while(|date| *date <= stand_up.date_naive()) {
            if !frequency.is_valid_day(date.weekday()) {
                continue;
            }
            if let Some(candidate) = resolve_local(tz, date, time) {
                let candidate = candidate - lead;
                prop_assert!(
                    candidate <= now || candidate >= at,
                    "{candidate} for {date} lies between {now} and {at}"
                );
            }
        }
    }
}
