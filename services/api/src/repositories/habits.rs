use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Row, postgres::PgRow};
use std::collections::{BTreeSet, HashMap};
use tracker::{Frequency, Habit, HabitStore, TrackerError, TrackerResult};
use uuid::Uuid;

use super::{PgStore, db_error, to_i32, to_u32};

const HABIT_COLUMNS: &str = "id, name, description, creator_id, frequency, duration_days, \
     target_value, unit, is_active, created_at, updated_at";

fn habit_from_row(row: &PgRow) -> TrackerResult<Habit> {
    let frequency: String = row.get("frequency");
    let frequency: Frequency = frequency
        .parse()
        .map_err(|e: TrackerError| TrackerError::storage(e.to_string()))?;

    Ok(Habit {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        creator_id: row.get("creator_id"),
        frequency,
        duration_days: to_u32("duration_days", row.get("duration_days"))?,
        target_value: row.get("target_value"),
        unit: row.get("unit"),
        completion_days: BTreeSet::new(),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

impl PgStore {
    /// Map rows to habits and attach their completion days
    async fn hydrate_habits(&self, rows: Vec<PgRow>) -> TrackerResult<Vec<Habit>> {
        let mut habits = rows.iter().map(habit_from_row).collect::<TrackerResult<Vec<_>>>()?;
        if habits.is_empty() {
            return Ok(habits);
        }

        let ids: Vec<Uuid> = habits.iter().map(|h| h.id).collect();
        let day_rows = sqlx::query(
            r#"
            SELECT habit_id, day
            FROM habit_completion_days
            WHERE habit_id = ANY($1)
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut days: HashMap<Uuid, BTreeSet<NaiveDate>> = HashMap::new();
        for row in day_rows {
            days.entry(row.get("habit_id"))
                .or_default()
                .insert(row.get("day"));
        }
        for habit in &mut habits {
            if let Some(set) = days.remove(&habit.id) {
                habit.completion_days = set;
            }
        }
        Ok(habits)
    }
}

#[async_trait]
impl HabitStore for PgStore {
    async fn insert_habit(&self, habit: &Habit) -> TrackerResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO habits (id, name, description, creator_id, frequency, duration_days,
                                target_value, unit, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(habit.id)
        .bind(&habit.name)
        .bind(&habit.description)
        .bind(habit.creator_id)
        .bind(habit.frequency.as_str())
        .bind(to_i32("duration_days", habit.duration_days)?)
        .bind(habit.target_value)
        .bind(&habit.unit)
        .bind(habit.is_active)
        .bind(habit.created_at)
        .bind(habit.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        if !habit.completion_days.is_empty() {
            let days: Vec<NaiveDate> = habit.completion_days.iter().copied().collect();
            sqlx::query(
                r#"
                INSERT INTO habit_completion_days (habit_id, day)
                SELECT $1, UNNEST($2::date[])
                "#,
            )
            .bind(habit.id)
            .bind(&days)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)
    }

    async fn find_habit(&self, id: Uuid) -> TrackerResult<Option<Habit>> {
        let rows = sqlx::query(&format!("SELECT {} FROM habits WHERE id = $1", HABIT_COLUMNS))
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(self.hydrate_habits(rows).await?.into_iter().next())
    }

    async fn update_habit(&self, habit: &Habit) -> TrackerResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE habits
            SET name = $2, description = $3, frequency = $4, duration_days = $5,
                target_value = $6, unit = $7, is_active = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(habit.id)
        .bind(&habit.name)
        .bind(&habit.description)
        .bind(habit.frequency.as_str())
        .bind(to_i32("duration_days", habit.duration_days)?)
        .bind(habit.target_value)
        .bind(&habit.unit)
        .bind(habit.is_active)
        .bind(habit.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(TrackerError::not_found("habit", habit.id));
        }
        Ok(())
    }

    async fn list_habits_by_creator(&self, creator_id: Uuid) -> TrackerResult<Vec<Habit>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM habits WHERE creator_id = $1 ORDER BY created_at",
            HABIT_COLUMNS
        ))
        .bind(creator_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        self.hydrate_habits(rows).await
    }

    async fn list_habits_by_ids(&self, ids: &[Uuid]) -> TrackerResult<Vec<Habit>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM habits WHERE id = ANY($1) ORDER BY created_at",
            HABIT_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        self.hydrate_habits(rows).await
    }

    async fn add_completion_day(&self, habit_id: Uuid, day: NaiveDate) -> TrackerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO habit_completion_days (habit_id, day)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(habit_id)
        .bind(day)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn remove_completion_day(&self, habit_id: Uuid, day: NaiveDate) -> TrackerResult<()> {
        sqlx::query("DELETE FROM habit_completion_days WHERE habit_id = $1 AND day = $2")
            .bind(habit_id)
            .bind(day)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}
