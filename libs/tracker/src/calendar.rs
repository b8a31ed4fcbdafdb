//! Calendar-day handling
//!
//! All days are UTC calendar days. A timestamp is reduced to its UTC date
//! before it touches the ledger, so a completion logged at 23:30 in one
//! timezone and 00:30 in the next cannot land on two different days.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Today as a UTC calendar day
    fn today(&self) -> NaiveDate {
        normalize_day(self.now())
    }
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Noon UTC on `day`
    pub fn on(day: NaiveDate) -> Self {
        FixedClock(day.and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default()).and_utc())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Reduce a timestamp to its UTC calendar day
pub fn normalize_day(at: DateTime<Utc>) -> NaiveDate {
    at.date_naive()
}

/// Midnight UTC at the start of `day`
pub fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

/// Parse a day from `YYYY-MM-DD` or an RFC 3339 timestamp
///
/// Timestamps carrying an offset are converted to UTC first.
pub fn parse_day(input: &str) -> TrackerResult<NaiveDate> {
    let input = input.trim();

    if let Ok(day) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(day);
    }

    DateTime::parse_from_rfc3339(input)
        .map(|at| normalize_day(at.with_timezone(&Utc)))
        .map_err(|_| {
            TrackerError::validation(format!(
                "'{}' is not a date (YYYY-MM-DD) or RFC 3339 timestamp",
                input
            ))
        })
}

/// Whole calendar days from `from` to `to`; negative when `to` is earlier
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Inclusive day window; an open end is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DayRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> TrackerResult<Self> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(TrackerError::validation(format!(
                    "range start {} is after range end {}",
                    from, to
                )));
            }
        }
        Ok(DayRange { from, to })
    }

    pub fn all() -> Self {
        DayRange::default()
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn late_evening_timestamps_normalize_to_their_utc_day() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 23, 59, 59).unwrap();
        assert_eq!(normalize_day(at), day(2026, 3, 9));
        assert_eq!(start_of_day(day(2026, 3, 9)), Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap());
    }

    #[test]
    fn parse_day_accepts_plain_dates_and_offsets() {
        assert_eq!(parse_day("2026-02-28").unwrap(), day(2026, 2, 28));
        // 01:00 at +02:00 is still the previous day in UTC
        assert_eq!(parse_day("2026-03-01T01:00:00+02:00").unwrap(), day(2026, 2, 28));
        assert_eq!(parse_day(" 2026-03-01T10:00:00Z ").unwrap(), day(2026, 3, 1));
    }

    #[test]
    fn parse_day_rejects_garbage() {
        assert!(matches!(parse_day("yesterday"), Err(TrackerError::Validation(_))));
        assert!(matches!(parse_day("2026-02-30"), Err(TrackerError::Validation(_))));
    }

    #[test]
    fn fixed_clock_reports_its_day() {
        let clock = FixedClock::on(day(2024, 2, 29));
        assert_eq!(clock.today(), day(2024, 2, 29));
    }

    #[test]
    fn day_range_bounds_are_inclusive() {
        let range = DayRange::new(Some(day(2026, 1, 1)), Some(day(2026, 1, 31))).unwrap();
        assert!(range.contains(day(2026, 1, 1)));
        assert!(range.contains(day(2026, 1, 31)));
        assert!(!range.contains(day(2026, 2, 1)));
        assert!(DayRange::all().contains(day(1970, 1, 1)));
        assert!(DayRange::new(Some(day(2026, 2, 1)), Some(day(2026, 1, 1))).is_err());
    }

    #[test]
    fn days_between_crosses_leap_day() {
        assert_eq!(days_between(day(2024, 2, 28), day(2024, 3, 1)), 2);
        assert_eq!(days_between(day(2024, 3, 1), day(2024, 2, 28)), -2);
    }
}
