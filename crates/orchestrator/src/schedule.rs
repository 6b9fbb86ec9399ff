//! Timezone- and frequency-aware occurrence computation.
//!
//! All functions are pure: they take `now` explicitly and never read a clock.

use chrono::{DateTime, Datelike, Days, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::domain::Frequency;

/// Upper bound on days searched. Every frequency has a valid day within a week.
const MAX_LOOKAHEAD_DAYS: u64 = 8;

/// Resolve a local wall-clock time to a UTC instant.
///
/// A time inside a DST gap moves forward one hour; an ambiguous time
/// resolves to the earlier instant.
#[must_use]
pub fn resolve_local(tz: Tz, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Utc>> {
    let naive = date.and_time(time);
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(at) => Some(at.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            let shifted = naive.checked_add_signed(chrono::Duration::hours(1))?;
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|at| at.with_timezone(&Utc))
        }
    }
}

/// The nearest instant strictly after `now` at local `time` on a day valid
/// for `frequency`.
#[must_use]
pub fn next_valid_occurrence(
    now: DateTime<Utc>,
    tz: Tz,
    time: NaiveTime,
    frequency: Frequency,
) -> Option<DateTime<Utc>> {
    next_valid_occurrence_with_lead(now, tz, time, chrono::Duration::zero(), frequency)
}

/// The nearest instant strictly after `now` that lies `lead` before an
/// occurrence of local `time` on a day valid for `frequency`.
///
/// The day filter applies to the occurrence, not to the earlier instant, so
/// a lead crossing midnight lands on the evening before a valid day.
#[must_use]
pub fn next_valid_occurrence_with_lead(
    now: DateTime<Utc>,
    tz: Tz,
    time: NaiveTime,
    lead: chrono::Duration,
    frequency: Frequency,
) -> Option<DateTime<Utc>> {
    let today = now.with_timezone(&tz).date_naive();
    (0..=MAX_LOOKAHEAD_DAYS)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter(|date| frequency.is_valid_day(date.weekday()))
        .filter_map(|date| resolve_local(tz, date, time))
        .filter_map(|at| at.checked_sub_signed(lead))
        .find(|at| *at > now)
}

/// The nearest instant strictly after `now` at local `time`, any day.
#[must_use]
pub fn next_occurrence(now: DateTime<Utc>, tz: Tz, time: NaiveTime) -> Option<DateTime<Utc>> {
    next_valid_occurrence(now, tz, time, Frequency::EveryDay)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Weekday;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn given_saturday_in_kolkata_when_weekdays_then_monday_local_time() {
        // Saturday 2024-03-02 12:00 IST
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 6, 30, 0).unwrap();
        let at = next_valid_occurrence(now, chrono_tz::Asia::Kolkata, hm(10, 30), Frequency::Weekdays)
            .unwrap();

        let local = at.with_timezone(&chrono_tz::Asia::Kolkata);
        assert_eq!(local.weekday(), Weekday::Mon);
        assert_eq!(local.time(), hm(10, 30));
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 3, 4, 5, 0, 0).unwrap());
    }

    #[test]
    fn given_time_later_today_when_every_day_then_today() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap();
        let at = next_occurrence(now, chrono_tz::UTC, hm(9, 0)).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap());
    }

    #[test]
    fn given_exactly_now_when_computing_then_next_day() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        let at = next_occurrence(now, chrono_tz::UTC, hm(9, 0)).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap());
    }

    #[test]
    fn given_dst_gap_when_resolving_then_shifted_forward_one_hour() {
        // 2024-03-10 02:30 does not exist in New York.
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let at = resolve_local(chrono_tz::America::New_York, date, hm(2, 30)).unwrap();
        let local = at.with_timezone(&chrono_tz::America::New_York);
        assert_eq!(local.time(), hm(3, 30));
    }

    #[test]
    fn given_ambiguous_time_when_resolving_then_earliest_instant() {
        // 2024-11-03 01:30 happens twice in New York; first is EDT (UTC-4).
        let date = NaiveDate::from_ymd_opt(2024, 11, 3).unwrap();
        let at = resolve_local(chrono_tz::America::New_York, date, hm(1, 30)).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 11, 3, 5, 30, 0).unwrap());
    }

    #[test]
    fn given_weekday_stand_up_after_midnight_when_lead_crosses_midnight_then_sunday_evening() {
        // Saturday 2024-03-02 12:00 UTC; stand-up at 00:15 on weekdays.
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
        let lead = chrono::Duration::minutes(30);

        let at = next_valid_occurrence_with_lead(now, chrono_tz::UTC, hm(0, 15), lead, Frequency::Weekdays)
            .unwrap();

        // Sunday 23:45, ahead of Monday's stand-up.
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 3, 3, 23, 45, 0).unwrap());
    }

    #[test]
    fn given_friday_evening_when_lead_crosses_midnight_then_saturday_skipped() {
        // Friday 2024-03-08 23:50 UTC; Saturday and Sunday have no stand-up.
        let now = Utc.with_ymd_and_hms(2024, 3, 8, 23, 50, 0).unwrap();
        let lead = chrono::Duration::minutes(30);

        let at = next_valid_occurrence_with_lead(now, chrono_tz::UTC, hm(0, 15), lead, Frequency::Weekdays)
            .unwrap();

        assert_eq!(at, Utc.with_ymd_and_hms(2024, 3, 10, 23, 45, 0).unwrap());
    }

    #[test]
    fn given_zero_lead_when_computing_then_same_as_occurrence() {
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 6, 30, 0).unwrap();
        let tz = chrono_tz::Asia::Kolkata;
        assert_eq!(
            next_valid_occurrence_with_lead(now, tz, hm(10, 30), chrono::Duration::zero(), Frequency::Weekdays),
            next_valid_occurrence(now, tz, hm(10, 30), Frequency::Weekdays)
        );
    }
}
