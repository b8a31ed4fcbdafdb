//! Domain entities and command payloads

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::TrackerError;

/// How often a habit is meant to be done
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Custom,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Custom => "custom",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "custom" => Ok(Frequency::Custom),
            other => Err(TrackerError::validation(format!("unknown frequency '{}'", other))),
        }
    }
}

/// User account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(skip_serializing)]
    pub google_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A user must be able to sign in somehow
    pub fn has_credential(&self) -> bool {
        self.password_hash.is_some() || self.google_id.is_some()
    }
}

/// Habit definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub creator_id: Uuid,
    pub frequency: Frequency,
    pub duration_days: u32,
    pub target_value: f64,
    pub unit: String,
    /// Days the creator completed the habit, one entry per day
    pub completion_days: BTreeSet<NaiveDate>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Habit {
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

/// Payload for creating a habit
#[derive(Debug, Clone, Deserialize)]
pub struct NewHabit {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frequency: Frequency,
    pub duration_days: u32,
    #[serde(default = "default_target_value")]
    pub target_value: f64,
    #[serde(default)]
    pub unit: String,
}

fn default_target_value() -> f64 {
    1.0
}

/// Partial habit update; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateHabit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<Frequency>,
    pub duration_days: Option<u32>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
}

/// One ledger row: a user's state for a habit on a calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub habit_id: Uuid,
    pub day: NaiveDate,
    pub completed: bool,
    /// Set exactly when `completed` is true
    pub completed_at: Option<DateTime<Utc>>,
    pub value: Option<f64>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressEntry {
    /// Apply a completion flag, keeping `completed_at` in step with it
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        match (self.completed, completed) {
            (false, true) => self.completed_at = Some(now),
            (_, false) => self.completed_at = None,
            (true, true) => {}
        }
        self.completed = completed;
    }
}

/// Payload for logging progress on a habit
#[derive(Debug, Clone, Deserialize)]
pub struct RecordCompletion {
    /// `YYYY-MM-DD` or RFC 3339; today (UTC) when absent
    pub day: Option<String>,
    #[serde(default = "default_completed")]
    pub completed: bool,
    pub value: Option<f64>,
    pub notes: Option<String>,
}

fn default_completed() -> bool {
    true
}

impl RecordCompletion {
    pub fn done_on(day: NaiveDate) -> Self {
        RecordCompletion {
            day: Some(day.to_string()),
            completed: true,
            value: None,
            notes: None,
        }
    }
}

/// Group of users sharing habits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub creator_id: Uuid,
    pub members: BTreeSet<Uuid>,
    pub habits: BTreeSet<Uuid>,
    pub is_private: bool,
    pub max_members: u32,
    /// Present exactly when the group is public
    pub invite_code: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.members.contains(&user_id)
    }

    pub fn is_full(&self) -> bool {
        self.member_count() >= self.max_members
    }

    pub fn member_count(&self) -> u32 {
        u32::try_from(self.members.len()).unwrap_or(u32::MAX)
    }
}

/// Payload for creating a group
#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_private: bool,
    pub max_members: Option<u32>,
}

/// Partial group update; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGroup {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_private: Option<bool>,
    pub max_members: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ProgressEntry {
        let now = Utc::now();
        ProgressEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            habit_id: Uuid::new_v4(),
            day: now.date_naive(),
            completed: false,
            completed_at: None,
            value: None,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn completed_at_follows_the_completed_flag() {
        let mut entry = entry();
        let first = Utc::now();
        entry.set_completed(true, first);
        assert_eq!(entry.completed_at, Some(first));

        // Re-completing keeps the original stamp
        entry.set_completed(true, first + chrono::Duration::hours(2));
        assert_eq!(entry.completed_at, Some(first));

        entry.set_completed(false, first);
        assert!(!entry.completed);
        assert_eq!(entry.completed_at, None);
    }

    #[test]
    fn frequency_round_trips_through_text() {
        for frequency in [
            Frequency::Daily,
            Frequency::Weekly,
            Frequency::Monthly,
            Frequency::Custom,
        ] {
            assert_eq!(frequency.as_str().parse::<Frequency>().unwrap(), frequency);
        }
        assert!("hourly".parse::<Frequency>().is_err());
    }

    #[test]
    fn record_completion_defaults_to_completed_today() {
        let payload: RecordCompletion = serde_json::from_str("{}").unwrap();
        assert!(payload.completed);
        assert!(payload.day.is_none());
    }

    #[test]
    fn user_secrets_are_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: Some("$argon2id$...".to_string()),
            google_id: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("google_id").is_none());
        assert!(user.has_credential());
    }
}
