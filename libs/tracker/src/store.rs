//! Storage ports
//!
//! Adapters report broken uniqueness (duplicate ledger tuple, username,
//! membership) as [`TrackerError::Conflict`](crate::TrackerError::Conflict)
//! and every other failure as `Storage`.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::calendar::DayRange;
use crate::error::TrackerResult;
use crate::models::{Group, Habit, ProgressEntry, User};

/// Read access to accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user(&self, id: Uuid) -> TrackerResult<Option<User>>;

    async fn find_users(&self, ids: &[Uuid]) -> TrackerResult<Vec<User>>;
}

#[async_trait]
pub trait HabitStore: Send + Sync {
    async fn insert_habit(&self, habit: &Habit) -> TrackerResult<()>;

    async fn find_habit(&self, id: Uuid) -> TrackerResult<Option<Habit>>;

    /// Persist the editable fields and `is_active`; completion days are
    /// maintained through the dedicated methods
    async fn update_habit(&self, habit: &Habit) -> TrackerResult<()>;

    async fn list_habits_by_creator(&self, creator_id: Uuid) -> TrackerResult<Vec<Habit>>;

    async fn list_habits_by_ids(&self, ids: &[Uuid]) -> TrackerResult<Vec<Habit>>;

    /// Idempotent
    async fn add_completion_day(&self, habit_id: Uuid, day: NaiveDate) -> TrackerResult<()>;

    /// Idempotent
    async fn remove_completion_day(&self, habit_id: Uuid, day: NaiveDate) -> TrackerResult<()>;
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn find_entry(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        day: NaiveDate,
    ) -> TrackerResult<Option<ProgressEntry>>;

    /// Fails with `Conflict` when the (user, habit, day) tuple already exists
    async fn insert_entry(&self, entry: &ProgressEntry) -> TrackerResult<()>;

    async fn update_entry(&self, entry: &ProgressEntry) -> TrackerResult<()>;

    /// Entries of one user for one habit, ascending by day
    async fn list_entries(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        range: DayRange,
    ) -> TrackerResult<Vec<ProgressEntry>>;

    /// Entries of every user for the given habits, ascending by day
    async fn list_entries_for_habits(
        &self,
        habit_ids: &[Uuid],
        range: DayRange,
    ) -> TrackerResult<Vec<ProgressEntry>>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Inserts the group with its initial members and habits
    async fn insert_group(&self, group: &Group) -> TrackerResult<()>;

    async fn find_group(&self, id: Uuid) -> TrackerResult<Option<Group>>;

    async fn find_group_by_invite_code(&self, code: &str) -> TrackerResult<Option<Group>>;

    /// Persist name, description, privacy, capacity, invite code and `is_active`
    ///
    /// The member count is checked against the new `max_members` atomically
    /// with the write, failing with `Validation` when it no longer fits. A
    /// taken invite code fails with `Conflict`.
    async fn update_group(&self, group: &Group) -> TrackerResult<()>;

    /// Adds a member unless the group already holds `max_members`.
    ///
    /// The capacity check and the insert are atomic per group. Fails with
    /// `Conflict` when full or already a member.
    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> TrackerResult<()>;

    /// Returns whether the user was a member
    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> TrackerResult<bool>;

    /// Idempotent
    async fn add_group_habit(&self, group_id: Uuid, habit_id: Uuid) -> TrackerResult<()>;

    /// Returns whether the habit was shared
    async fn remove_group_habit(&self, group_id: Uuid, habit_id: Uuid) -> TrackerResult<bool>;

    /// Active groups the user belongs to
    async fn list_groups_for_member(&self, user_id: Uuid) -> TrackerResult<Vec<Group>>;

    async fn list_public_groups(&self) -> TrackerResult<Vec<Group>>;

    /// Whether an active group contains both the user and the habit
    async fn shares_habit_with(&self, user_id: Uuid, habit_id: Uuid) -> TrackerResult<bool>;
}

/// Everything the tracker needs from persistence
pub trait Store: UserStore + HabitStore + ProgressStore + GroupStore {}

impl<T> Store for T where T: UserStore + HabitStore + ProgressStore + GroupStore {}
