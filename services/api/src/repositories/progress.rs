use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Row, postgres::PgRow};
use tracker::{DayRange, ProgressEntry, ProgressStore, TrackerError, TrackerResult};
use uuid::Uuid;

use super::{PgStore, db_error};

fn entry_from_row(row: &PgRow) -> ProgressEntry {
    ProgressEntry {
        id: row.get("id"),
        user_id: row.get("user_id"),
        habit_id: row.get("habit_id"),
        day: row.get("day"),
        completed: row.get("completed"),
        completed_at: row.get("completed_at"),
        value: row.get("value"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl ProgressStore for PgStore {
    async fn find_entry(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        day: NaiveDate,
    ) -> TrackerResult<Option<ProgressEntry>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, habit_id, day, completed, completed_at, value, notes,
                   created_at, updated_at
            FROM progress_entries
            WHERE user_id = $1 AND habit_id = $2 AND day = $3
            "#,
        )
        .bind(user_id)
        .bind(habit_id)
        .bind(day)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.as_ref().map(entry_from_row))
    }

    async fn insert_entry(&self, entry: &ProgressEntry) -> TrackerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO progress_entries (id, user_id, habit_id, day, completed, completed_at,
                                          value, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.habit_id)
        .bind(entry.day)
        .bind(entry.completed)
        .bind(entry.completed_at)
        .bind(entry.value)
        .bind(&entry.notes)
        .bind(entry.created_at)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn update_entry(&self, entry: &ProgressEntry) -> TrackerResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE progress_entries
            SET completed = $2, completed_at = $3, value = $4, notes = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(entry.id)
        .bind(entry.completed)
        .bind(entry.completed_at)
        .bind(entry.value)
        .bind(&entry.notes)
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(TrackerError::not_found("progress entry", entry.id));
        }
        Ok(())
    }

    async fn list_entries(
        &self,
        user_id: Uuid,
        habit_id: Uuid,
        range: DayRange,
    ) -> TrackerResult<Vec<ProgressEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, habit_id, day, completed, completed_at, value, notes,
                   created_at, updated_at
            FROM progress_entries
            WHERE user_id = $1 AND habit_id = $2
              AND ($3::date IS NULL OR day >= $3)
              AND ($4::date IS NULL OR day <= $4)
            ORDER BY day
            "#,
        )
        .bind(user_id)
        .bind(habit_id)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.iter().map(entry_from_row).collect())
    }

    async fn list_entries_for_habits(
        &self,
        habit_ids: &[Uuid],
        range: DayRange,
    ) -> TrackerResult<Vec<ProgressEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, habit_id, day, completed, completed_at, value, notes,
                   created_at, updated_at
            FROM progress_entries
            WHERE habit_id = ANY($1)
              AND ($2::date IS NULL OR day >= $2)
              AND ($3::date IS NULL OR day <= $3)
            ORDER BY day, user_id
            "#,
        )
        .bind(habit_ids)
        .bind(range.from)
        .bind(range.to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.iter().map(entry_from_row).collect())
    }
}
