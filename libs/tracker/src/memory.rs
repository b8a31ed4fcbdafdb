//! In-memory store
//!
//! Same uniqueness and capacity rules as the Postgres adapter, enforced
//! under one lock.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::calendar::DayRange;
use crate::error::{TrackerError, TrackerResult};
use crate::models::{Group, Habit, ProgressEntry, User};
use crate::store::{GroupStore, HabitStore, ProgressStore, UserStore};

type LedgerKey = (Uuid, Uuid, NaiveDate);

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    habits: HashMap<Uuid, Habit>,
    entries: HashMap<LedgerKey, ProgressEntry>,
    groups: HashMap<Uuid, Group>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account; username and email must be unique
    pub async fn insert_user(&self, user: User) -> TrackerResult<()> {
        let mut inner = self.inner.lock().await;
        let taken = inner
            .users
            .values()
            .any(|u| u.username == user.username || u.email == user.email);
        if taken {
            return Err(TrackerError::conflict("username or email already registered"));
        }
        inner.users.insert(user.id, user);
        Ok(())
    }

    /// Number of ledger rows, for asserting on uniqueness
    pub async fn entry_count(&self) -> usize {
        self.inner.lock().await.entries.len()
    }
}

fn sorted_by_day(mut entries: Vec<ProgressEntry>) -> Vec<ProgressEntry> {
    entries.sort_by(|a, b| a.day.cmp(&b.day).then(a.user_id.cmp(&b.user_id)));
    entries
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_user(&self, id: Uuid) -> TrackerResult<Option<User>> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> TrackerResult<Vec<User>> {
        let inner = self.inner.lock().await;
        Ok(ids.iter().filter_map(|id| inner.users.get(id).cloned()).collect())
    }
}

#[async_trait]
impl HabitStore for InMemoryStore {
    async fn insert_habit(&self, habit: &Habit) -> TrackerResult<()> {
        let mut inner = self.inner.lock().await;
        if inner.habits.contains_key(&habit.id) {
            return Err(TrackerError::conflict(format!("habit {} already exists", habit.id)));
        }
        inner.habits.insert(habit.id, habit.clone());
        Ok(())
    }

    async fn find_habit(&self, id: Uuid) -> TrackerResult<Option<Habit>> {
        Ok(self.inner.lock().await.habits.get(&id).cloned())
    }

    async fn update_habit(&self, habit: &Habit) -> TrackerResult<()> {
        let mut inner = self.inner.lock().await;
        let stored = inner
            .habits
            .get_mut(&habit.id)
            .ok_or_else(|| TrackerError::not_found("habit", habit.id))?;

        let completion_days = std::mem::take(&mut stored.completion_days);
        *stored = habit.clone();
        stored.completion_days = completion_days;
        Ok(())
    }

    async fn list_habits_by_creator(&self, creator_id: Uuid) -> TrackerResult<Vec<Habit>> {
        let inner = self.inner.lock().await;
        let mut habits: Vec<Habit> = inner
            .habits
            .values()
            .filter(|h| h.creator_id == creator_id)
            .cloned()
            .collect();
        habits.sort_by_key(|h| h.created_at);
        Ok(habits)
    }

    async fn list_habits_by_ids(&self, ids: &[Uuid]) -> TrackerResult<Vec<Habit>> {
        let inner = self.inner.lock().await;
        Ok(ids.iter().filter_map(|id| inner.habits.get(id).cloned()).collect())
    }

    async fn add_completion_day(&self, habit_id: Uuid, day: NaiveDate) -> TrackerResult<()> {
        let mut inner = self.inner.lock().await;
        let habit = inner
            .habits
            .get_mut(&habit_id)
            .ok_or_else(|| TrackerError::not_found("habit", habit_id))?;
        habit.completion_days.insert(day);
        Ok(())
    }

    async fn remove_completion_day(&self, habit_id: Uuid, day: NaiveDate) -> TrackerResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(habit) = inner.habits.get_mut(&habit_id) {
            habit.completion_days.remove(&day);
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for InMemoryStore {
    async fn find_entry(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        day: NaiveDate,
    ) -> TrackerResult<Option<ProgressEntry>> {
        let inner = self.inner.lock().await;
        Ok(inner.entries.get(&(user_id, habit_id, day)).cloned())
    }

    async fn insert_entry(&self, entry: &ProgressEntry) -> TrackerResult<()> {
        let mut inner = self.inner.lock().await;
        let key = (entry.user_id, entry.habit_id, entry.day);
        if inner.entries.contains_key(&key) {
            return Err(TrackerError::conflict(format!(
                "progress for habit {} on {} already recorded",
                entry.habit_id, entry.day
            )));
        }
        inner.entries.insert(key, entry.clone());
        Ok(())
    }

    async fn update_entry(&self, entry: &ProgressEntry) -> TrackerResult<()> {
        let mut inner = self.inner.lock().await;
        let key = (entry.user_id, entry.habit_id, entry.day);
        match inner.entries.get_mut(&key) {
            Some(stored) if stored.id == entry.id => {
                *stored = entry.clone();
                Ok(())
            }
            _ => Err(TrackerError::not_found("progress entry", entry.id)),
        }
    }

    async fn list_entries(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        range: DayRange,
    ) -> TrackerResult<Vec<ProgressEntry>> {
        let inner = self.inner.lock().await;
        let entries = inner
            .entries
            .values()
            .filter(|e| e.user_id == user_id && e.habit_id == habit_id && range.contains(e.day))
            .cloned()
            .collect();
        Ok(sorted_by_day(entries))
    }

    async fn list_entries_for_habits(
        &self,
        habit_ids: &[Uuid],
        range: DayRange,
    ) -> TrackerResult<Vec<ProgressEntry>> {
        let inner = self.inner.lock().await;
        let entries = inner
            .entries
            .values()
            .filter(|e| habit_ids.contains(&e.habit_id) && range.contains(e.day))
            .cloned()
            .collect();
        Ok(sorted_by_day(entries))
    }
}

#[async_trait]
impl GroupStore for InMemoryStore {
    async fn insert_group(&self, group: &Group) -> TrackerResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(code) = &group.invite_code {
            let clash = inner
                .groups
                .values()
                .any(|g| g.invite_code.as_deref() == Some(code.as_str()));
            if clash {
                return Err(TrackerError::conflict("invite code already in use"));
            }
        }
        inner.groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn find_group(&self, id: Uuid) -> TrackerResult<Option<Group>> {
        Ok(self.inner.lock().await.groups.get(&id).cloned())
    }

    async fn find_group_by_invite_code(&self, code: &str) -> TrackerResult<Option<Group>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .groups
            .values()
            .find(|g| g.invite_code.as_deref() == Some(code))
            .cloned())
    }

    async fn update_group(&self, group: &Group) -> TrackerResult<()> {
        let mut inner = self.inner.lock().await;
        if let Some(code) = &group.invite_code {
            let clash = inner
                .groups
                .values()
                .any(|g| g.id != group.id && g.invite_code.as_deref() == Some(code.as_str()));
            if clash {
                return Err(TrackerError::conflict("invite code already in use"));
            }
        }

        let stored = inner
            .groups
            .get_mut(&group.id)
            .ok_or_else(|| TrackerError::not_found("group", group.id))?;

        // Members may have joined since the caller read the group
        if stored.member_count() > group.max_members {
            return Err(TrackerError::validation(format!(
                "max_members cannot be below the current {} members",
                stored.member_count()
            )));
        }

        stored.name = group.name.clone();
        stored.description = group.description.clone();
        stored.is_private = group.is_private;
        stored.max_members = group.max_members;
        stored.invite_code = group.invite_code.clone();
        stored.is_active = group.is_active;
        stored.updated_at = group.updated_at;
        Ok(())
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> TrackerResult<()> {
        let mut inner = self.inner.lock().await;
        let group = inner
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| TrackerError::not_found("group", group_id))?;

        if group.is_member(user_id) {
            return Err(TrackerError::conflict("already a member of this group"));
        }
        if group.is_full() {
            return Err(TrackerError::conflict(format!(
                "group is full ({} members)",
                group.max_members
            )));
        }
        group.members.insert(user_id);
        Ok(())
    }

    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> TrackerResult<bool> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .groups
            .get_mut(&group_id)
            .is_some_and(|g| g.members.remove(&user_id)))
    }

    async fn add_group_habit(&self, group_id: Uuid, habit_id: Uuid) -> TrackerResult<()> {
        let mut inner = self.inner.lock().await;
        let group = inner
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| TrackerError::not_found("group", group_id))?;
        group.habits.insert(habit_id);
        Ok(())
    }

    async fn remove_group_habit(&self, group_id: Uuid, habit_id: Uuid) -> TrackerResult<bool> {
        let mut inner = self.inner.lock().await;
        Ok(inner
            .groups
            .get_mut(&group_id)
            .is_some_and(|g| g.habits.remove(&habit_id)))
    }

    async fn list_groups_for_member(&self, user_id: Uuid) -> TrackerResult<Vec<Group>> {
        let inner = self.inner.lock().await;
        let mut groups: Vec<Group> = inner
            .groups
            .values()
            .filter(|g| g.is_active && g.is_member(user_id))
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.created_at);
        Ok(groups)
    }

    async fn list_public_groups(&self) -> TrackerResult<Vec<Group>> {
        let inner = self.inner.lock().await;
        let mut groups: Vec<Group> = inner
            .groups
            .values()
            .filter(|g| g.is_active && !g.is_private)
            .cloned()
            .collect();
        groups.sort_by_key(|g| g.created_at);
        Ok(groups)
    }

    async fn shares_habit_with(&self, user_id: Uuid, habit_id: Uuid) -> TrackerResult<bool> {
        let inner = self.inner.lock().await;
        Ok(inner
            .groups
            .values()
            .any(|g| g.is_active && g.is_member(user_id) && g.habits.contains(&habit_id)))
    }
}
