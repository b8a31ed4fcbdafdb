//! PostgreSQL adapter for the tracker storage ports

use sqlx::PgPool;
use tracing::{error, warn};
use tracker::TrackerError;

mod groups;
mod habits;
mod progress;
mod users;

/// Postgres-backed implementation of [`tracker::Store`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Client-facing text for a broken unique constraint
fn conflict_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some(c) if c.contains("invite_code") => "invite code already in use",
        Some(c) if c.starts_with("progress_entries") => "progress already recorded for this day",
        Some(c) if c.starts_with("group_members") => "already a member of this group",
        Some(c) if c.starts_with("group_habits") => "habit already shared with this group",
        Some(c) if c.starts_with("users") => "user already exists",
        _ => "record already exists",
    }
}

/// Unique violations become `Conflict`, anything else `Storage`
pub(crate) fn db_error(err: sqlx::Error) -> TrackerError {
    if let Some(db) = err.as_database_error() {
        if db.is_unique_violation() {
            warn!(constraint = ?db.constraint(), detail = %db.message(), "Unique constraint violated");
            return TrackerError::conflict(conflict_message(db.constraint()));
        }
    }
    error!(error = %err, "Database query failed");
    TrackerError::storage(err.to_string())
}

/// Integer columns that are never negative in a consistent database
pub(crate) fn to_u32(column: &str, value: i32) -> Result<u32, TrackerError> {
    u32::try_from(value)
        .map_err(|_| TrackerError::storage(format!("{} holds negative value {}", column, value)))
}

pub(crate) fn to_i32(column: &str, value: u32) -> Result<i32, TrackerError> {
    i32::try_from(value)
        .map_err(|_| TrackerError::validation(format!("{} is too large", column)))
}
