//! Completion rate relative to the days a habit has been running

use chrono::NaiveDate;

use crate::calendar::days_between;

/// Days a habit is expected to have been completed by `today`
///
/// Elapsed whole days since creation, capped at the habit's duration.
/// Zero on the creation day itself and for clocks behind the creation day.
pub fn expected_days(created_on: NaiveDate, duration_days: u32, today: NaiveDate) -> u32 {
    let elapsed = days_between(created_on, today).max(0);
    u32::try_from(elapsed)
        .unwrap_or(u32::MAX)
        .min(duration_days)
}

/// Percentage of expected days that were completed, clamped to `[0, 100]`
pub fn completion_rate(completed_days: u32, expected_days: u32) -> f64 {
    if expected_days == 0 {
        return 0.0;
    }

    let rate = f64::from(completed_days) * 100.0 / f64::from(expected_days);
    rate.clamp(0.0, 100.0)
}

/// Distinct completed days that fall inside `[created_on, today]`
pub fn completed_since<'a, I>(days: I, created_on: NaiveDate, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = &'a NaiveDate>,
{
    let days: std::collections::BTreeSet<&NaiveDate> = days
        .into_iter()
        .filter(|day| **day >= created_on && **day <= today)
        .collect();
    u32::try_from(days.len()).unwrap_or(u32::MAX)
}
