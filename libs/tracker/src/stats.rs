//! Derived statistics
//!
//! Everything here is recomputed from ledger rows on read; nothing is
//! cached on the habit.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::completion::{completed_since, completion_rate, expected_days};
use crate::models::{Habit, ProgressEntry};
use crate::streak::{current_streak, longest_streak};

/// One user's standing on one habit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitStats {
    pub habit_id: Uuid,
    pub habit_name: String,
    pub user_id: Uuid,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Distinct completed days, all time
    pub total_completions: u32,
    pub expected_days: u32,
    /// Percentage in `[0, 100]`
    pub completion_rate: f64,
    pub last_completed: Option<NaiveDate>,
}

impl HabitStats {
    /// Compute from ledger rows; rows of other users or habits are skipped
    pub fn compute(habit: &Habit, user_id: Uuid, entries: &[ProgressEntry], today: NaiveDate) -> Self {
        let days: BTreeSet<NaiveDate> = entries
            .iter()
            .filter(|e| e.user_id == user_id && e.habit_id == habit.id && e.completed)
            .map(|e| e.day)
            .collect();

        let expected = expected_days(habit.created_on(), habit.duration_days, today);
        let completed = completed_since(&days, habit.created_on(), today);

        HabitStats {
            habit_id: habit.id,
            habit_name: habit.name.clone(),
            user_id,
            current_streak: current_streak(days.iter().copied(), today),
            longest_streak: longest_streak(days.iter().copied()),
            total_completions: u32::try_from(days.len()).unwrap_or(u32::MAX),
            expected_days: expected,
            completion_rate: completion_rate(completed, expected),
            last_completed: days.iter().next_back().copied(),
        }
    }
}

/// A group member's standing across the group's habits
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberStats {
    pub user_id: Uuid,
    pub username: String,
    /// Sum of current streaks over the group's habits
    pub total_current_streak: u32,
    pub habits: Vec<HabitStats>,
}

impl MemberStats {
    pub fn new(user_id: Uuid, username: String, habits: Vec<HabitStats>) -> Self {
        let total_current_streak = habits.iter().map(|h| h.current_streak).sum();
        MemberStats {
            user_id,
            username,
            total_current_streak,
            habits,
        }
    }
}

/// Highest combined streak first, ties broken by username
pub fn rank_members(members: &mut [MemberStats]) {
    members.sort_by(|a, b| {
        b.total_current_streak
            .cmp(&a.total_current_streak)
            .then_with(|| a.username.cmp(&b.username))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Frequency;
    use chrono::{Duration, Utc};

    fn habit(created_days_ago: i64, today: NaiveDate) -> Habit {
        let created_at = crate::calendar::start_of_day(today - Duration::days(created_days_ago));
        Habit {
            id: Uuid::new_v4(),
            name: "Read".to_string(),
            description: String::new(),
            creator_id: Uuid::new_v4(),
            frequency: Frequency::Daily,
            duration_days: 30,
            target_value: 1.0,
            unit: "chapter".to_string(),
            completion_days: BTreeSet::new(),
            is_active: true,
            created_at,
            updated_at: created_at,
        }
    }

    fn entry(habit: &Habit, user_id: Uuid, day: NaiveDate, completed: bool) -> ProgressEntry {
        let now = Utc::now();
        ProgressEntry {
            id: Uuid::new_v4(),
            user_id,
            habit_id: habit.id,
            day,
            completed,
            completed_at: completed.then_some(now),
            value: None,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn compute_ignores_incomplete_and_foreign_rows() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 20).unwrap();
        let habit = habit(10, today);
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();

        let mut entries: Vec<ProgressEntry> = [0, 1, 2, 4, 5, 7, 9]
            .iter()
            .map(|n| entry(&habit, user, today - Duration::days(*n), true))
            .collect();
        entries.push(entry(&habit, user, today - Duration::days(3), false));
        entries.push(entry(&habit, other, today - Duration::days(3), true));

        let stats = HabitStats::compute(&habit, user, &entries, today);
        assert_eq!(stats.current_streak, 3);
        assert_eq!(stats.longest_streak, 3);
        assert_eq!(stats.total_completions, 7);
        assert_eq!(stats.expected_days, 10);
        assert_eq!(stats.completion_rate, 70.0);
        assert_eq!(stats.last_completed, Some(today));
    }

    #[test]
    fn fresh_habit_has_zero_rate() {
        let today = NaiveDate::from_ymd_opt(2026, 5, 20).unwrap();
        let habit = habit(0, today);
        let user = Uuid::new_v4();
        let entries = vec![entry(&habit, user, today, true)];

        let stats = HabitStats::compute(&habit, user, &entries, today);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.expected_days, 0);
        assert_eq!(stats.completion_rate, 0.0);
    }

    #[test]
    fn members_rank_by_streak_then_name() {
        let mut members = vec![
            MemberStats::new(Uuid::new_v4(), "carol".to_string(), vec![]),
            MemberStats {
                total_current_streak: 4,
                ..MemberStats::new(Uuid::new_v4(), "bob".to_string(), vec![])
            },
            MemberStats::new(Uuid::new_v4(), "alice".to_string(), vec![]),
        ];
        rank_members(&mut members);
        let names: Vec<_> = members.iter().map(|m| m.username.as_str()).collect();
        assert_eq!(names, ["bob", "alice", "carol"]);
    }
}
