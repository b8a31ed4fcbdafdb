//! Progress ledger behaviour against the in-memory store

mod common;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracker::store::{GroupStore, HabitStore, ProgressStore, UserStore};
use tracker::{
    DayRange, Group, Habit, InMemoryStore, NewGroup, ProgressEntry, RecordCompletion,
    TrackerError, TrackerResult, UpdateHabit, User,
};
use uuid::Uuid;

use common::{Harness, days_ago, today};

#[tokio::test]
async fn recording_twice_updates_the_same_row() {
    let h = Harness::new();
    let ada = h.user("ada").await;
    let habit = h.habit_aged(ada, 5, 30).await;

    let first = h
        .tracker
        .record_completion(ada, habit, RecordCompletion::done_on(today()))
        .await
        .unwrap();
    let second = h
        .tracker
        .record_completion(
            ada,
            habit,
            RecordCompletion {
                day: Some(today().to_string()),
                completed: true,
                value: Some(12.5),
                notes: Some("longer session".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(h.store.entry_count().await, 1);
    assert_eq!(second.value, Some(12.5));
    assert_eq!(second.notes, "longer session");
    // completed_at keeps the first completion stamp
    assert_eq!(second.completed_at, first.completed_at);
}

#[tokio::test]
async fn completed_at_is_cleared_when_unchecked() {
    let h = Harness::new();
    let ada = h.user("ada").await;
    let habit = h.habit_aged(ada, 5, 30).await;

    h.tracker
        .record_completion(ada, habit, RecordCompletion::done_on(today()))
        .await
        .unwrap();
    let undone = h
        .tracker
        .record_completion(
            ada,
            habit,
            RecordCompletion {
                day: None,
                completed: false,
                value: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    assert!(!undone.completed);
    assert!(undone.completed_at.is_none());

    let stored = h.tracker.get_habit(ada, habit).await.unwrap();
    assert!(stored.completion_days.is_empty());
}

#[tokio::test]
async fn creator_completions_mirror_into_the_habit() {
    let h = Harness::new();
    let ada = h.user("ada").await;
    let habit = h.habit_aged(ada, 5, 30).await;

    for n in [0, 1, 1, 3] {
        h.tracker
            .record_completion(ada, habit, RecordCompletion::done_on(days_ago(n)))
            .await
            .unwrap();
    }

    let stored = h.tracker.get_habit(ada, habit).await.unwrap();
    let days: Vec<NaiveDate> = stored.completion_days.into_iter().collect();
    assert_eq!(days, vec![days_ago(3), days_ago(1), days_ago(0)]);
}

#[tokio::test]
async fn timestamps_are_normalized_to_utc_days() {
    let h = Harness::new();
    let ada = h.user("ada").await;
    let habit = h.habit_aged(ada, 5, 30).await;

    let late = format!("{}T23:45:00-02:00", days_ago(2));
    let entry = h
        .tracker
        .record_completion(
            ada,
            habit,
            RecordCompletion {
                day: Some(late),
                completed: true,
                value: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    // 23:45 at -02:00 is 01:45 UTC the next day
    assert_eq!(entry.day, days_ago(1));
}

#[tokio::test]
async fn future_and_pre_creation_days_are_rejected() {
    let h = Harness::new();
    let ada = h.user("ada").await;
    let habit = h.habit_aged(ada, 5, 30).await;

    for day in [days_ago(-1), days_ago(6)] {
        let err = h
            .tracker
            .record_completion(ada, habit, RecordCompletion::done_on(day))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)), "{day}: {err:?}");
    }
    assert_eq!(h.store.entry_count().await, 0);
}

#[tokio::test]
async fn negative_values_are_rejected() {
    let h = Harness::new();
    let ada = h.user("ada").await;
    let habit = h.habit_aged(ada, 5, 30).await;

    let err = h
        .tracker
        .record_completion(
            ada,
            habit,
            RecordCompletion {
                day: None,
                completed: true,
                value: Some(-1.0),
                notes: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::Validation(_)));
}

#[tokio::test]
async fn deleted_habits_reject_progress_but_keep_history() {
    let h = Harness::new();
    let ada = h.user("ada").await;
    let habit = h.habit_aged(ada, 5, 30).await;

    h.tracker
        .record_completion(ada, habit, RecordCompletion::done_on(days_ago(1)))
        .await
        .unwrap();
    h.tracker.delete_habit(ada, habit).await.unwrap();

    let err = h
        .tracker
        .record_completion(ada, habit, RecordCompletion::done_on(today()))
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::Validation(_)));

    let err = h
        .tracker
        .update_habit(
            ada,
            habit,
            UpdateHabit {
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::Validation(_)));

    let history = h
        .tracker
        .progress_history(ada, habit, DayRange::all())
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert!(h.tracker.list_habits(ada).await.unwrap().is_empty());
}

#[tokio::test]
async fn strangers_cannot_log_progress() {
    let h = Harness::new();
    let ada = h.user("ada").await;
    let eve = h.user("eve").await;
    let habit = h.habit_aged(ada, 5, 30).await;

    let err = h
        .tracker
        .record_completion(eve, habit, RecordCompletion::done_on(today()))
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::Forbidden(_)));

    let err = h.tracker.habit_stats(eve, habit).await.unwrap_err();
    assert!(matches!(err, TrackerError::NotFound { .. }));
}

#[tokio::test]
async fn group_members_log_their_own_ledger() {
    let h = Harness::new();
    let ada = h.user("ada").await;
    let bob = h.user("bob").await;
    let habit = h.habit_aged(ada, 5, 30).await;

    let group = h
        .tracker
        .create_group(
            ada,
            NewGroup {
                name: "Morning club".to_string(),
                description: String::new(),
                is_private: false,
                max_members: None,
            },
        )
        .await
        .unwrap();
    h.tracker.share_habit(ada, group.id, habit).await.unwrap();
    h.tracker.join_group(bob, group.id).await.unwrap();

    h.tracker
        .record_completion(bob, habit, RecordCompletion::done_on(today()))
        .await
        .unwrap();

    // bob's completion is not the creator's
    let stored = h.tracker.get_habit(bob, habit).await.unwrap();
    assert!(stored.completion_days.is_empty());

    let bob_stats = h.tracker.habit_stats(bob, habit).await.unwrap();
    assert_eq!(bob_stats.current_streak, 1);
    let ada_stats = h.tracker.habit_stats(ada, habit).await.unwrap();
    assert_eq!(ada_stats.current_streak, 0);

    // leaving the group revokes access
    h.tracker.leave_group(bob, group.id).await.unwrap();
    let err = h
        .tracker
        .record_completion(bob, habit, RecordCompletion::done_on(today()))
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::Forbidden(_)));
}

#[tokio::test]
async fn stats_match_the_worked_example() {
    let h = Harness::new();
    let ada = h.user("ada").await;
    let habit = h.habit_aged(ada, 10, 30).await;

    for n in [0, 1, 2, 4, 5, 7, 9] {
        h.tracker
            .record_completion(ada, habit, RecordCompletion::done_on(days_ago(n)))
            .await
            .unwrap();
    }

    let stats = h.tracker.habit_stats(ada, habit).await.unwrap();
    assert_eq!(stats.expected_days, 10);
    assert_eq!(stats.completion_rate, 70.0);
    assert_eq!(stats.current_streak, 3);
    assert_eq!(stats.longest_streak, 3);
    assert_eq!(stats.total_completions, 7);

    let dashboard = h.tracker.dashboard(ada).await.unwrap();
    assert_eq!(dashboard, vec![stats]);
}

#[tokio::test]
async fn history_is_filtered_and_ordered() {
    let h = Harness::new();
    let ada = h.user("ada").await;
    let habit = h.habit_aged(ada, 10, 30).await;

    for n in [0, 6, 3, 8] {
        h.tracker
            .record_completion(ada, habit, RecordCompletion::done_on(days_ago(n)))
            .await
            .unwrap();
    }

    let range = DayRange::new(Some(days_ago(7)), Some(days_ago(1))).unwrap();
    let history = h.tracker.progress_history(ada, habit, range).await.unwrap();
    let days: Vec<_> = history.iter().map(|e| e.day).collect();
    assert_eq!(days, vec![days_ago(6), days_ago(3)]);
}

/// Store whose first `find_entry` misses, as if a concurrent request
/// inserted the row between our read and our insert.
struct StaleRead {
    inner: InMemoryStore,
    missed: AtomicBool,
}

#[async_trait]
impl UserStore for StaleRead {
    async fn find_user(&self, id: Uuid) -> TrackerResult<Option<User>> {
        self.inner.find_user(id).await
    }

    async fn find_users(&self, ids: &[Uuid]) -> TrackerResult<Vec<User>> {
        self.inner.find_users(ids).await
    }
}

#[async_trait]
impl HabitStore for StaleRead {
    async fn insert_habit(&self, habit: &Habit) -> TrackerResult<()> {
        self.inner.insert_habit(habit).await
    }

    async fn find_habit(&self, id: Uuid) -> TrackerResult<Option<Habit>> {
        self.inner.find_habit(id).await
    }

    async fn update_habit(&self, habit: &Habit) -> TrackerResult<()> {
        self.inner.update_habit(habit).await
    }

    async fn list_habits_by_creator(&self, creator_id: Uuid) -> TrackerResult<Vec<Habit>> {
        self.inner.list_habits_by_creator(creator_id).await
    }

    async fn list_habits_by_ids(&self, ids: &[Uuid]) -> TrackerResult<Vec<Habit>> {
        self.inner.list_habits_by_ids(ids).await
    }

    async fn add_completion_day(&self, habit_id: Uuid, day: NaiveDate) -> TrackerResult<()> {
        self.inner.add_completion_day(habit_id, day).await
    }

    async fn remove_completion_day(&self, habit_id: Uuid, day: NaiveDate) -> TrackerResult<()> {
        self.inner.remove_completion_day(habit_id, day).await
    }
}

#[async_trait]
impl ProgressStore for StaleRead {
    async fn find_entry(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        day: NaiveDate,
    ) -> TrackerResult<Option<ProgressEntry>> {
        if !self.missed.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.find_entry(user_id, habit_id, day).await
    }

    async fn insert_entry(&self, entry: &ProgressEntry) -> TrackerResult<()> {
        self.inner.insert_entry(entry).await
    }

    async fn update_entry(&self, entry: &ProgressEntry) -> TrackerResult<()> {
        self.inner.update_entry(entry).await
    }

    async fn list_entries(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        range: DayRange,
    ) -> TrackerResult<Vec<ProgressEntry>> {
        self.inner.list_entries(user_id, habit_id, range).await
    }

    async fn list_entries_for_habits(
        &self,
        habit_ids: &[Uuid],
        range: DayRange,
    ) -> TrackerResult<Vec<ProgressEntry>> {
        self.inner.list_entries_for_habits(habit_ids, range).await
    }
}

#[async_trait]
impl GroupStore for StaleRead {
    async fn insert_group(&self, group: &Group) -> TrackerResult<()> {
        self.inner.insert_group(group).await
    }

    async fn find_group(&self, id: Uuid) -> TrackerResult<Option<Group>> {
        self.inner.find_group(id).await
    }

    async fn find_group_by_invite_code(&self, code: &str) -> TrackerResult<Option<Group>> {
        self.inner.find_group_by_invite_code(code).await
    }

    async fn update_group(&self, group: &Group) -> TrackerResult<()> {
        self.inner.update_group(group).await
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> TrackerResult<()> {
        self.inner.add_member(group_id, user_id).await
    }

    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> TrackerResult<bool> {
        self.inner.remove_member(group_id, user_id).await
    }

    async fn add_group_habit(&self, group_id: Uuid, habit_id: Uuid) -> TrackerResult<()> {
        self.inner.add_group_habit(group_id, habit_id).await
    }

    async fn remove_group_habit(&self, group_id: Uuid, habit_id: Uuid) -> TrackerResult<bool> {
        self.inner.remove_group_habit(group_id, habit_id).await
    }

    async fn list_groups_for_member(&self, user_id: Uuid) -> TrackerResult<Vec<Group>> {
        self.inner.list_groups_for_member(user_id).await
    }

    async fn list_public_groups(&self) -> TrackerResult<Vec<Group>> {
        self.inner.list_public_groups().await
    }

    async fn shares_habit_with(&self, user_id: Uuid, habit_id: Uuid) -> TrackerResult<bool> {
        self.inner.shares_habit_with(user_id, habit_id).await
    }
}

#[tokio::test]
async fn lost_insert_race_is_retried_as_update() {
    let backing = InMemoryStore::new();
    let stale = StaleRead {
        inner: backing.clone(),
        missed: AtomicBool::new(true),
    };
    let stale = Arc::new(stale);
    let h = Harness::over(stale.clone(), backing);

    let ada = h.user("ada").await;
    let habit = h.habit_aged(ada, 5, 30).await;

    let first = h
        .tracker
        .record_completion(ada, habit, RecordCompletion::done_on(today()))
        .await
        .unwrap();

    // Next lookup misses; the insert hits the uniqueness rule
    stale.missed.store(false, Ordering::SeqCst);
    let second = h
        .tracker
        .record_completion(
            ada,
            habit,
            RecordCompletion {
                day: Some(today().to_string()),
                completed: true,
                value: Some(3.0),
                notes: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.value, Some(3.0));
    assert_eq!(h.store.entry_count().await, 1);
}
