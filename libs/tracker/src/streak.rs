//! Streak calculation over completed calendar days

use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;

/// Consecutive completed days ending today, or ending yesterday when today
/// has not been completed yet.
///
/// Input order and duplicates do not matter. Days after `today` are ignored.
pub fn current_streak<I>(days: I, today: NaiveDate) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days: BTreeSet<NaiveDate> = days.into_iter().filter(|day| *day <= today).collect();

    let mut walk = days.iter().rev();
    let Some(&most_recent) = walk.next() else {
        return 0;
    };

    if most_recent < today - Duration::days(1) {
        return 0;
    }

    let mut streak = 1;
    let mut previous = most_recent;
    for &day in walk {
        if previous - day != Duration::days(1) {
            break;
        }
        streak += 1;
        previous = day;
    }

    streak
}

/// Longest run of consecutive days anywhere in the set
pub fn longest_streak<I>(days: I) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let days: BTreeSet<NaiveDate> = days.into_iter().collect();

    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for day in days {
        run = match previous {
            Some(prev) if day - prev == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }

    longest
}
