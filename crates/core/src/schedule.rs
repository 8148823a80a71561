//! Sending windows and the next-send calculator.
//!
//! A campaign's schedule restricts sends to an hour range on allowed
//! weekdays in a named timezone. [`compute_next_send`] turns an abstract
//! delay into a concrete UTC instant inside that window, with a little
//! jitter so batches of prospects don't all fire at the exact same second.

use std::collections::BTreeSet;

use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Hard cap on window-search iterations.
///
/// Bounds the scan against malformed schedules (e.g. weekday values
/// outside 0..=6) that would otherwise spin forever. Exhausting the cap
/// is a soft failure: the last computed instant is returned, never an
/// error.
const MAX_WINDOW_ITERATIONS: u32 = 14;

/// Upper bound on the jitter added when snapping to a window start.
const MAX_JITTER_SECS: i64 = 30 * 60;

/// Allowed weekday/hour range for a campaign, in its own timezone.
///
/// Weekday numbering is 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendingSchedule {
    /// First hour (inclusive) sends may go out, 0–23.
    pub start_hour: u8,
    /// Hour (exclusive) the window closes, 0–23.
    pub end_hour: u8,
    pub allowed_weekdays: BTreeSet<u8>,
    /// IANA timezone name; unparseable names resolve to UTC.
    pub timezone: String,
}

impl Default for SendingSchedule {
    /// 9:00–17:00 Monday through Friday, UTC.
    fn default() -> Self {
        Self {
            start_hour: 9,
            end_hour: 17,
            allowed_weekdays: (1..=5).collect(),
            timezone: "UTC".to_string(),
        }
    }
}

impl SendingSchedule {
    /// Structural validity: a non-empty window and at least one weekday.
    ///
    /// Deliberately does NOT check that weekday values fall in 0..=6 —
    /// such schedules are tolerated and bounded by the iteration cap
    /// instead of rejected.
    pub fn is_valid(&self) -> bool {
        self.start_hour < self.end_hour
            && self.end_hour <= 23
            && !self.allowed_weekdays.is_empty()
    }

    /// Resolve the IANA timezone, warning and falling back to UTC on
    /// unknown names.
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            warn!(timezone = %self.timezone, "unknown timezone, falling back to UTC");
            chrono_tz::UTC
        })
    }

    fn allows_weekday(&self, day: u8) -> bool {
        self.allowed_weekdays.contains(&day)
    }
}

/// Whether `now` falls inside the schedule's sending window.
///
/// Used by the periodic sweep as a cheap per-campaign filter before any
/// prospect queries happen.
pub fn is_within_window(schedule: &SendingSchedule, now: DateTime<Utc>) -> bool {
    let schedule = effective(schedule);
    let zoned = now.with_timezone(&schedule.tz());
    let weekday = zoned.weekday().num_days_from_sunday() as u8;
    let hour = zoned.hour() as u8;
    schedule.allows_weekday(weekday) && hour >= schedule.start_hour && hour < schedule.end_hour
}

/// Next valid send instant for `base + delay`, respecting the schedule.
///
/// Jitter of 0–30 minutes is added whenever the instant snaps forward to
/// a window start; an instant already inside the window is returned
/// untouched.
pub fn compute_next_send(
    base: DateTime<Utc>,
    delay_days: u32,
    delay_hours: u32,
    schedule: &SendingSchedule,
) -> DateTime<Utc> {
    compute_next_send_with(base, delay_days, delay_hours, schedule, &mut rand::thread_rng())
}

/// [`compute_next_send`] with an injected rng, for deterministic tests.
pub fn compute_next_send_with<R: Rng>(
    base: DateTime<Utc>,
    delay_days: u32,
    delay_hours: u32,
    schedule: &SendingSchedule,
    rng: &mut R,
) -> DateTime<Utc> {
    let schedule = effective(schedule);
    let tz = schedule.tz();

    let target = base + Duration::days(delay_days as i64) + Duration::hours(delay_hours as i64);
    let mut zoned = target.with_timezone(&tz);

    for _ in 0..MAX_WINDOW_ITERATIONS {
        let weekday = zoned.weekday().num_days_from_sunday() as u8;
        if schedule.allows_weekday(weekday) {
            let hour = zoned.hour() as u8;
            if hour < schedule.start_hour {
                // Too early today: snap to the window start plus jitter.
                let snapped = window_start_on(zoned.date_naive(), &schedule, tz);
                let jitter = Duration::seconds(rng.gen_range(0..MAX_JITTER_SECS));
                return (snapped + jitter).with_timezone(&Utc);
            }
            if hour < schedule.end_hour {
                return zoned.with_timezone(&Utc);
            }
        }
        // Wrong weekday or past the window: try the next day's start.
        zoned = window_start_on(zoned.date_naive() + Duration::days(1), &schedule, tz);
    }

    // Iteration cap exhausted: best computed instant, caller tolerates it.
    zoned.with_timezone(&Utc)
}

/// The schedule itself when valid, the system default otherwise.
fn effective(schedule: &SendingSchedule) -> SendingSchedule {
    if schedule.is_valid() {
        schedule.clone()
    } else {
        SendingSchedule {
            timezone: schedule.timezone.clone(),
            ..SendingSchedule::default()
        }
    }
}

/// The window-start instant on `day` in the schedule's timezone.
fn window_start_on(day: NaiveDate, schedule: &SendingSchedule, tz: Tz) -> DateTime<Tz> {
    let time = NaiveTime::from_hms_opt(schedule.start_hour as u32, 0, 0)
        .unwrap_or(NaiveTime::MIN);
    match tz.from_local_datetime(&day.and_time(time)) {
        LocalResult::Single(dt) => dt,
        // Fall-back transition: two candidates, take the earlier.
        LocalResult::Ambiguous(earlier, _) => earlier,
        // Spring-forward gap: the wall-clock time doesn't exist locally.
        LocalResult::None => tz.from_utc_datetime(&day.and_time(time)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    /// Tuesday 2025-06-10 10:30 UTC — inside the default window.
    fn tuesday_mid_morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 10, 30, 0).unwrap()
    }

    #[test]
    fn in_window_instant_is_returned_untouched() {
        let schedule = SendingSchedule::default();
        let base = tuesday_mid_morning();
        let next = compute_next_send_with(base, 0, 0, &schedule, &mut rng());
        assert_eq!(next, base);
    }

    #[test]
    fn early_morning_snaps_to_window_start_with_jitter() {
        let schedule = SendingSchedule::default();
        // Tuesday 06:00 UTC, before the 09:00 start.
        let base = Utc.with_ymd_and_hms(2025, 6, 10, 6, 0, 0).unwrap();
        let next = compute_next_send_with(base, 0, 0, &schedule, &mut rng());

        let window_start = Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap();
        assert!(next >= window_start);
        assert!(next < window_start + Duration::minutes(30));
    }

    #[test]
    fn after_hours_rolls_to_next_day() {
        let schedule = SendingSchedule::default();
        // Tuesday 18:00 UTC, past the 17:00 close.
        let base = Utc.with_ymd_and_hms(2025, 6, 10, 18, 0, 0).unwrap();
        let next = compute_next_send_with(base, 0, 0, &schedule, &mut rng());

        // Lands on Wednesday inside [09:00, 09:30).
        let wednesday_start = Utc.with_ymd_and_hms(2025, 6, 11, 9, 0, 0).unwrap();
        assert!(next >= wednesday_start);
        assert!(next < wednesday_start + Duration::minutes(30));
    }

    #[test]
    fn weekend_is_skipped_to_monday() {
        let schedule = SendingSchedule::default();
        // Saturday 2025-06-14 10:00 UTC.
        let base = Utc.with_ymd_and_hms(2025, 6, 14, 10, 0, 0).unwrap();
        let next = compute_next_send_with(base, 0, 0, &schedule, &mut rng());

        // Monday 2025-06-16, at or shortly after 09:00.
        assert_eq!(next.date_naive(), NaiveDate::from_ymd_opt(2025, 6, 16).unwrap());
        assert_eq!(next.hour(), 9);
    }

    #[test]
    fn delay_arithmetic_applies_before_window_search() {
        let schedule = SendingSchedule::default();
        let base = tuesday_mid_morning();
        // +2 days lands on Thursday 10:30, still in-window.
        let next = compute_next_send_with(base, 2, 0, &schedule, &mut rng());
        assert_eq!(next, base + Duration::days(2));

        // +3 days +3 hours lands Friday 13:30, in-window.
        let next = compute_next_send_with(base, 3, 3, &schedule, &mut rng());
        assert_eq!(next, base + Duration::days(3) + Duration::hours(3));
    }

    #[test]
    fn timezone_is_honored() {
        let schedule = SendingSchedule {
            timezone: "America/New_York".to_string(),
            ..SendingSchedule::default()
        };
        // 12:00 UTC on a Tuesday is 08:00 in New York (EDT), before the
        // window start, so the result snaps to 09:00 local = 13:00 UTC.
        let base = Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap();
        let next = compute_next_send_with(base, 0, 0, &schedule, &mut rng());

        let ny_start = Utc.with_ymd_and_hms(2025, 6, 10, 13, 0, 0).unwrap();
        assert!(next >= ny_start);
        assert!(next < ny_start + Duration::minutes(30));
    }

    #[test]
    fn unknown_timezone_falls_back_to_utc() {
        let schedule = SendingSchedule {
            timezone: "Mars/Olympus_Mons".to_string(),
            ..SendingSchedule::default()
        };
        let base = tuesday_mid_morning();
        assert_eq!(compute_next_send_with(base, 0, 0, &schedule, &mut rng()), base);
    }

    #[test]
    fn invalid_schedule_falls_back_to_default_window() {
        let schedule = SendingSchedule {
            start_hour: 17,
            end_hour: 9, // inverted
            allowed_weekdays: BTreeSet::new(),
            timezone: "UTC".to_string(),
        };
        let base = tuesday_mid_morning();
        // Under the default 9–17 Mon–Fri fallback the base is in-window.
        assert_eq!(compute_next_send_with(base, 0, 0, &schedule, &mut rng()), base);
    }

    #[test]
    fn unmatchable_weekdays_exhaust_iteration_cap_without_panicking() {
        // Weekday 7 never matches any real day; the schedule is otherwise
        // structurally valid so no fallback kicks in.
        let schedule = SendingSchedule {
            start_hour: 9,
            end_hour: 17,
            allowed_weekdays: [7u8].into_iter().collect(),
            timezone: "UTC".to_string(),
        };
        let base = tuesday_mid_morning();
        let next = compute_next_send_with(base, 0, 0, &schedule, &mut rng());

        // 14 day-advances from the base date, at the window start.
        assert_eq!(
            next.date_naive(),
            base.date_naive() + Duration::days(MAX_WINDOW_ITERATIONS as i64)
        );
        assert_eq!(next.hour(), 9);
    }

    #[test]
    fn window_containment_over_many_seeds() {
        let schedule = SendingSchedule::default();
        for seed in 0..50u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let base = Utc.with_ymd_and_hms(2025, 6, 8, 3, 0, 0).unwrap()
                + Duration::hours(seed as i64 * 7);
            let next = compute_next_send_with(base, 0, (seed % 48) as u32, &schedule, &mut rng);

            let weekday = next.weekday().num_days_from_sunday() as u8;
            assert!(
                schedule.allowed_weekdays.contains(&weekday),
                "seed {seed}: weekday {weekday} outside allowed set"
            );
            let hour = next.hour() as u8;
            assert!(
                hour >= schedule.start_hour && hour < schedule.end_hour,
                "seed {seed}: hour {hour} outside window"
            );
        }
    }

    #[test]
    fn is_within_window_matches_bounds() {
        let schedule = SendingSchedule::default();
        // Tuesday 08:59 — outside; 09:00 — inside; 16:59 — inside; 17:00 — outside.
        let day = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let at = |h: u32, m: u32| {
            Utc.from_utc_datetime(&day.and_time(NaiveTime::from_hms_opt(h, m, 0).unwrap()))
        };
        assert!(!is_within_window(&schedule, at(8, 59)));
        assert!(is_within_window(&schedule, at(9, 0)));
        assert!(is_within_window(&schedule, at(16, 59)));
        assert!(!is_within_window(&schedule, at(17, 0)));

        // Sunday is never in-window for the default schedule.
        let sunday = Utc.with_ymd_and_hms(2025, 6, 8, 12, 0, 0).unwrap();
        assert!(!is_within_window(&schedule, sunday));
    }
}
