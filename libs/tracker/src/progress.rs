//! Progress ledger and per-user statistics

use chrono::NaiveDate;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calendar::{DayRange, parse_day};
use crate::error::{TrackerError, TrackerResult};
use crate::models::{Habit, ProgressEntry, RecordCompletion};
use crate::service::{Tracker, bounded_text};
use crate::stats::HabitStats;

const MAX_NOTES_LEN: usize = 1000;

impl Tracker {
    /// Upsert the actor's ledger row for (habit, day)
    ///
    /// A lost insert race against a concurrent call for the same tuple is
    /// retried once as an update.
    pub async fn record_completion(
        &self,
        actor: Uuid,
        habit_id: Uuid,
        record: RecordCompletion,
    ) -> TrackerResult<ProgressEntry> {
        let habit = self.load_habit(habit_id).await?;
        if !self.can_access_habit(actor, &habit).await? {
            return Err(TrackerError::forbidden(
                "only the creator or members of a group sharing this habit can log progress",
            ));
        }
        if !habit.is_active {
            return Err(TrackerError::validation("habit has been deleted"));
        }

        let day = self.resolve_day(&habit, record.day.as_deref())?;
        if let Some(value) = record.value {
            if !value.is_finite() || value < 0.0 {
                return Err(TrackerError::validation("value must be a non-negative number"));
            }
        }
        let notes = record
            .notes
            .as_deref()
            .map(|n| bounded_text("notes", n, 0, MAX_NOTES_LEN))
            .transpose()?;

        let entry = match self.store().find_entry(actor, habit_id, day).await? {
            Some(existing) => self.apply(existing, &record, notes).await?,
            None => {
                let fresh = self.fresh_entry(actor, habit_id, day, &record, notes.clone());
                match self.store().insert_entry(&fresh).await {
                    Ok(()) => fresh,
                    Err(TrackerError::Conflict(_)) => {
                        warn!(%habit_id, %day, "Concurrent progress insert, retrying as update");
                        let existing = self
                            .store()
                            .find_entry(actor, habit_id, day)
                            .await?
                            .ok_or_else(|| TrackerError::storage("progress entry vanished after conflict"))?;
                        self.apply(existing, &record, notes).await?
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        if habit.creator_id == actor {
            if entry.completed {
                self.store().add_completion_day(habit_id, day).await?;
            } else {
                self.store().remove_completion_day(habit_id, day).await?;
            }
        }

        info!(
            %habit_id,
            user_id = %actor,
            %day,
            completed = entry.completed,
            "Progress recorded"
        );
        Ok(entry)
    }

    /// The actor's ledger rows for a habit, ascending by day
    pub async fn progress_history(
        &self,
        actor: Uuid,
        habit_id: Uuid,
        range: DayRange,
    ) -> TrackerResult<Vec<ProgressEntry>> {
        let habit = self.get_habit(actor, habit_id).await?;
        self.store().list_entries(actor, habit.id, range).await
    }

    pub async fn habit_stats(&self, actor: Uuid, habit_id: Uuid) -> TrackerResult<HabitStats> {
        let habit = self.get_habit(actor, habit_id).await?;
        self.stats_for(&habit, actor).await
    }

    /// Statistics for every habit the actor can see
    pub async fn dashboard(&self, actor: Uuid) -> TrackerResult<Vec<HabitStats>> {
        let habits = self.list_habits(actor).await?;
        let mut stats = Vec::with_capacity(habits.len());
        for habit in &habits {
            stats.push(self.stats_for(habit, actor).await?);
        }
        Ok(stats)
    }

    async fn stats_for(&self, habit: &Habit, user_id: Uuid) -> TrackerResult<HabitStats> {
        let entries = self
            .store()
            .list_entries(user_id, habit.id, DayRange::all())
            .await?;
        Ok(HabitStats::compute(habit, user_id, &entries, self.today()))
    }

    fn resolve_day(&self, habit: &Habit, day: Option<&str>) -> TrackerResult<NaiveDate> {
        let today = self.today();
        let day = match day {
            Some(raw) => parse_day(raw)?,
            None => today,
        };

        if day > today {
            return Err(TrackerError::validation(format!("{} is in the future", day)));
        }
        if day < habit.created_on() {
            return Err(TrackerError::validation(format!(
                "{} is before the habit was created",
                day
            )));
        }
        Ok(day)
    }

    fn fresh_entry(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        day: NaiveDate,
        record: &RecordCompletion,
        notes: Option<String>,
    ) -> ProgressEntry {
        let now = self.now();
        let mut entry = ProgressEntry {
            id: Uuid::new_v4(),
            user_id,
            habit_id,
            day,
            completed: false,
            completed_at: None,
            value: record.value,
            notes: notes.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        entry.set_completed(record.completed, now);
        entry
    }

    async fn apply(
        &self,
        mut entry: ProgressEntry,
        record: &RecordCompletion,
        notes: Option<String>,
    ) -> TrackerResult<ProgressEntry> {
        let now = self.now();
        entry.set_completed(record.completed, now);
        if record.value.is_some() {
            entry.value = record.value;
        }
        if let Some(notes) = notes {
            entry.notes = notes;
        }
        entry.updated_at = now;

        self.store().update_entry(&entry).await?;
        Ok(entry)
    }
}
