//! Local-calendar arithmetic for the daily run.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Resolves a local wall-clock time to an instant.
///
/// Ambiguous times take the earlier instant. Times inside a DST gap move
/// forward to the first representable quarter hour.
#[must_use]
pub fn resolve_local(tz: Tz, local: NaiveDateTime) -> DateTime<Utc> {
    let mut candidate = local;
    for _ in 0..8 {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => return dt.with_timezone(&Utc),
            LocalResult::None => candidate += Duration::minutes(15),
        }
    }
    local.and_utc()
}

/// Local calendar date of an instant.
#[must_use]
pub fn local_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// Half-open `[start, end)` covering local midnight to the next local midnight.
#[must_use]
pub fn day_bounds(date: NaiveDate, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = resolve_local(tz, date.and_time(NaiveTime::MIN));
    let next = date.succ_opt().unwrap_or(date);
    let end = resolve_local(tz, next.and_time(NaiveTime::MIN));
    (start, end)
}

/// Start of the local day containing `now`.
#[must_use]
pub fn start_of_day(now: DateTime<Utc>, tz: Tz) -> DateTime<Utc> {
    day_bounds(local_date(now, tz), tz).0
}

/// The day a run at `now` aggregates: the local day before today.
#[must_use]
pub fn previous_local_day(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    let today = local_date(now, tz);
    today.pred_opt().unwrap_or(today)
}

/// First instant strictly after `now` whose local time is `run_at`.
#[must_use]
pub fn next_run_after(now: DateTime<Utc>, run_at: NaiveTime, tz: Tz) -> DateTime<Utc> {
    let today = local_date(now, tz);
    let candidate = resolve_local(tz, today.and_time(run_at));
    if candidate > now {
        return candidate;
    }
    let tomorrow = today.succ_opt().unwrap_or(today);
    resolve_local(tz, tomorrow.and_time(run_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::{America, Asia, UTC};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_day_bounds_utc() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let (start, end) = day_bounds(date, UTC);
        assert_eq!(start, utc(2026, 3, 1, 0, 0));
        assert_eq!(end, utc(2026, 3, 2, 0, 0));
    }

    #[test]
    fn test_day_bounds_offset_zone() {
        // Kolkata is UTC+05:30
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let (start, end) = day_bounds(date, Asia::Kolkata);
        assert_eq!(start, utc(2026, 2, 28, 18, 30));
        assert_eq!(end, utc(2026, 3, 1, 18, 30));
    }

    #[test]
    fn test_day_bounds_spring_forward_is_short() {
        // US DST starts 2026-03-08
        let date = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let (start, end) = day_bounds(date, America::New_York);
        assert_eq!(end - start, Duration::hours(23));
    }

    #[test]
    fn test_previous_local_day_crosses_zone_boundary() {
        // 20:00 UTC on Mar 1 is already Mar 2 in Kolkata
        let now = utc(2026, 3, 1, 20, 0);
        assert_eq!(previous_local_day(now, UTC), NaiveDate::from_ymd_opt(2026, 2, 28).unwrap());
        assert_eq!(
            previous_local_day(now, Asia::Kolkata),
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_next_run_after() {
        let midnight = NaiveTime::MIN;
        assert_eq!(next_run_after(utc(2026, 3, 1, 10, 0), midnight, UTC), utc(2026, 3, 2, 0, 0));
        // exactly at run time moves to the next day
        assert_eq!(next_run_after(utc(2026, 3, 2, 0, 0), midnight, UTC), utc(2026, 3, 3, 0, 0));

        let half_past_eleven = NaiveTime::from_hms_opt(23, 30, 0).unwrap();
        assert_eq!(
            next_run_after(utc(2026, 3, 1, 10, 0), half_past_eleven, UTC),
            utc(2026, 3, 1, 23, 30)
        );
    }

    #[test]
    fn test_start_of_day() {
        assert_eq!(start_of_day(utc(2026, 3, 1, 20, 0), Asia::Kolkata), utc(2026, 3, 1, 18, 30));
    }
}
