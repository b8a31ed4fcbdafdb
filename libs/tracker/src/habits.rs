//! Habit lifecycle

use std::collections::{BTreeSet, HashSet};
use tracing::info;
use uuid::Uuid;

use crate::error::{TrackerError, TrackerResult};
use crate::models::{Habit, NewHabit, UpdateHabit};
use crate::service::{Tracker, bounded_text};

const MAX_NAME_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_UNIT_LEN: usize = 32;
const MAX_DURATION_DAYS: u32 = 3650;

fn check_duration(duration_days: u32) -> TrackerResult<u32> {
    if duration_days == 0 || duration_days > MAX_DURATION_DAYS {
        return Err(TrackerError::validation(format!(
            "duration_days must be between 1 and {}",
            MAX_DURATION_DAYS
        )));
    }
    Ok(duration_days)
}

fn check_target(target_value: f64) -> TrackerResult<f64> {
    if !target_value.is_finite() || target_value <= 0.0 {
        return Err(TrackerError::validation("target_value must be a positive number"));
    }
    Ok(target_value)
}

impl Tracker {
    pub async fn create_habit(&self, actor: Uuid, new: NewHabit) -> TrackerResult<Habit> {
        let now = self.now();
        let habit = Habit {
            id: Uuid::new_v4(),
            name: bounded_text("name", &new.name, 1, MAX_NAME_LEN)?,
            description: bounded_text("description", &new.description, 0, MAX_DESCRIPTION_LEN)?,
            creator_id: actor,
            frequency: new.frequency,
            duration_days: check_duration(new.duration_days)?,
            target_value: check_target(new.target_value)?,
            unit: bounded_text("unit", &new.unit, 0, MAX_UNIT_LEN)?,
            completion_days: BTreeSet::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.store().insert_habit(&habit).await?;
        info!(habit_id = %habit.id, creator_id = %actor, "Habit created");
        Ok(habit)
    }

    /// Visible to the creator and to members of groups sharing it
    pub async fn get_habit(&self, actor: Uuid, id: Uuid) -> TrackerResult<Habit> {
        let habit = self.load_habit(id).await?;
        if !self.can_access_habit(actor, &habit).await? {
            // Do not reveal that the habit exists
            return Err(TrackerError::not_found("habit", id));
        }
        Ok(habit)
    }

    /// Own active habits, then active habits shared into the actor's groups
    pub async fn list_habits(&self, actor: Uuid) -> TrackerResult<Vec<Habit>> {
        let mut habits: Vec<Habit> = self
            .store()
            .list_habits_by_creator(actor)
            .await?
            .into_iter()
            .filter(|h| h.is_active)
            .collect();

        let mut seen: HashSet<Uuid> = habits.iter().map(|h| h.id).collect();
        let shared_ids: Vec<Uuid> = self
            .store()
            .list_groups_for_member(actor)
            .await?
            .into_iter()
            .flat_map(|g| g.habits)
            .filter(|id| seen.insert(*id))
            .collect();

        if !shared_ids.is_empty() {
            let shared = self.store().list_habits_by_ids(&shared_ids).await?;
            habits.extend(shared.into_iter().filter(|h| h.is_active));
        }

        Ok(habits)
    }

    /// Creator only; soft-deleted habits are frozen
    pub async fn update_habit(&self, actor: Uuid, id: Uuid, update: UpdateHabit) -> TrackerResult<Habit> {
        let mut habit = self.owned_habit(actor, id).await?;
        if !habit.is_active {
            return Err(TrackerError::validation("habit has been deleted"));
        }

        if let Some(name) = update.name {
            habit.name = bounded_text("name", &name, 1, MAX_NAME_LEN)?;
        }
        if let Some(description) = update.description {
            habit.description = bounded_text("description", &description, 0, MAX_DESCRIPTION_LEN)?;
        }
        if let Some(frequency) = update.frequency {
            habit.frequency = frequency;
        }
        if let Some(duration_days) = update.duration_days {
            habit.duration_days = check_duration(duration_days)?;
        }
        if let Some(target_value) = update.target_value {
            habit.target_value = check_target(target_value)?;
        }
        if let Some(unit) = update.unit {
            habit.unit = bounded_text("unit", &unit, 0, MAX_UNIT_LEN)?;
        }
        habit.updated_at = self.now();

        self.store().update_habit(&habit).await?;
        info!(habit_id = %habit.id, "Habit updated");
        Ok(habit)
    }

    /// Soft delete; progress history is kept
    pub async fn delete_habit(&self, actor: Uuid, id: Uuid) -> TrackerResult<()> {
        let mut habit = self.owned_habit(actor, id).await?;
        if !habit.is_active {
            return Ok(());
        }

        habit.is_active = false;
        habit.updated_at = self.now();
        self.store().update_habit(&habit).await?;
        info!(habit_id = %habit.id, "Habit deactivated");
        Ok(())
    }

    async fn owned_habit(&self, actor: Uuid, id: Uuid) -> TrackerResult<Habit> {
        let habit = self.get_habit(actor, id).await?;
        if habit.creator_id != actor {
            return Err(TrackerError::forbidden("only the creator can modify this habit"));
        }
        Ok(habit)
    }
}
