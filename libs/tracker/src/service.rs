//! The tracker facade
//!
//! Operations are split by concern: habits in [`crate::habits`], the
//! progress ledger and statistics in [`crate::progress`], groups in
//! [`crate::groups`]. Every operation takes the acting user's id, which
//! the HTTP layer has already authenticated.

use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::calendar::{Clock, SystemClock};
use crate::error::{TrackerError, TrackerResult};
use crate::models::{Group, Habit};
use crate::store::Store;

#[derive(Clone)]
pub struct Tracker {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl Tracker {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub(crate) fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Habit by id, active or not
    pub(crate) async fn load_habit(&self, id: Uuid) -> TrackerResult<Habit> {
        self.store
            .find_habit(id)
            .await?
            .ok_or_else(|| TrackerError::not_found("habit", id))
    }

    /// Creator, or member of an active group the habit is shared into
    pub(crate) async fn can_access_habit(&self, actor: Uuid, habit: &Habit) -> TrackerResult<bool> {
        if habit.creator_id == actor {
            return Ok(true);
        }
        self.store.shares_habit_with(actor, habit.id).await
    }

    /// Active group by id; soft-deleted groups read as absent
    pub(crate) async fn load_group(&self, id: Uuid) -> TrackerResult<Group> {
        self.store
            .find_group(id)
            .await?
            .filter(|g| g.is_active)
            .ok_or_else(|| TrackerError::not_found("group", id))
    }
}

/// Trim `value` and check its length in characters
pub(crate) fn bounded_text(field: &str, value: &str, min: usize, max: usize) -> TrackerResult<String> {
    let value = value.trim();
    let len = value.chars().count();

    if len < min {
        return Err(if min == 1 {
            TrackerError::validation(format!("{} is required", field))
        } else {
            TrackerError::validation(format!("{} must be at least {} characters", field, min))
        });
    }
    if len > max {
        return Err(TrackerError::validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }

    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_text_trims_and_checks_length() {
        assert_eq!(bounded_text("name", "  Read  ", 1, 10).unwrap(), "Read");
        assert_eq!(
            bounded_text("name", "   ", 1, 10),
            Err(TrackerError::validation("name is required"))
        );
        assert!(bounded_text("name", "abcdefghijk", 1, 10).is_err());
        // counted in characters, not bytes
        assert!(bounded_text("name", "ééééé", 1, 5).is_ok());
    }
}
