use async_trait::async_trait;
use sqlx::{Row, postgres::PgRow};
use std::collections::{BTreeSet, HashMap};
use tracing::info;
use tracker::{Group, GroupStore, TrackerError, TrackerResult};
use uuid::Uuid;

use super::{PgStore, db_error, to_i32, to_u32};

const GROUP_COLUMNS: &str = "g.id, g.name, g.description, g.creator_id, g.is_private, \
     g.max_members, g.invite_code, g.is_active, g.created_at, g.updated_at";

fn group_from_row(row: &PgRow) -> TrackerResult<Group> {
    Ok(Group {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        creator_id: row.get("creator_id"),
        members: BTreeSet::new(),
        habits: BTreeSet::new(),
        is_private: row.get("is_private"),
        max_members: to_u32("max_members", row.get("max_members"))?,
        invite_code: row.get("invite_code"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// `group_id -> ids` from a two-column link table
fn collect_links(rows: Vec<PgRow>, column: &str) -> HashMap<Uuid, BTreeSet<Uuid>> {
    let mut links: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
    for row in rows {
        links
            .entry(row.get("group_id"))
            .or_default()
            .insert(row.get(column));
    }
    links
}

impl PgStore {
    /// Map rows to groups and attach members and shared habits
    async fn hydrate_groups(&self, rows: Vec<PgRow>) -> TrackerResult<Vec<Group>> {
        let mut groups = rows.iter().map(group_from_row).collect::<TrackerResult<Vec<_>>>()?;
        if groups.is_empty() {
            return Ok(groups);
        }

        let ids: Vec<Uuid> = groups.iter().map(|g| g.id).collect();
        let member_rows = sqlx::query(
            "SELECT group_id, user_id FROM group_members WHERE group_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        let habit_rows = sqlx::query(
            "SELECT group_id, habit_id FROM group_habits WHERE group_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut members = collect_links(member_rows, "user_id");
        let mut habits = collect_links(habit_rows, "habit_id");
        for group in &mut groups {
            group.members = members.remove(&group.id).unwrap_or_default();
            group.habits = habits.remove(&group.id).unwrap_or_default();
        }
        Ok(groups)
    }

    async fn fetch_groups(&self, sql: &str, bind: Option<Uuid>) -> TrackerResult<Vec<Group>> {
        let mut query = sqlx::query(sql);
        if let Some(id) = bind {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(db_error)?;
        self.hydrate_groups(rows).await
    }
}

#[async_trait]
impl GroupStore for PgStore {
    async fn insert_group(&self, group: &Group) -> TrackerResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query(
            r#"
            INSERT INTO groups (id, name, description, creator_id, is_private, max_members,
                                invite_code, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.creator_id)
        .bind(group.is_private)
        .bind(to_i32("max_members", group.max_members)?)
        .bind(&group.invite_code)
        .bind(group.is_active)
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        let members: Vec<Uuid> = group.members.iter().copied().collect();
        sqlx::query(
            r#"
            INSERT INTO group_members (group_id, user_id)
            SELECT $1, UNNEST($2::uuid[])
            "#,
        )
        .bind(group.id)
        .bind(&members)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        let habits: Vec<Uuid> = group.habits.iter().copied().collect();
        sqlx::query(
            r#"
            INSERT INTO group_habits (group_id, habit_id)
            SELECT $1, UNNEST($2::uuid[])
            "#,
        )
        .bind(group.id)
        .bind(&habits)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)
    }

    async fn find_group(&self, id: Uuid) -> TrackerResult<Option<Group>> {
        let sql = format!("SELECT {} FROM groups g WHERE g.id = $1", GROUP_COLUMNS);
        Ok(self.fetch_groups(&sql, Some(id)).await?.into_iter().next())
    }

    async fn find_group_by_invite_code(&self, code: &str) -> TrackerResult<Option<Group>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM groups g WHERE g.invite_code = $1",
            GROUP_COLUMNS
        ))
        .bind(code)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(self.hydrate_groups(rows).await?.into_iter().next())
    }

    async fn update_group(&self, group: &Group) -> TrackerResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Same row lock as add_member, so no join slips in before the write
        sqlx::query("SELECT id FROM groups WHERE id = $1 FOR UPDATE")
            .bind(group.id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
            .ok_or_else(|| TrackerError::not_found("group", group.id))?;

        let members: i64 = sqlx::query("SELECT COUNT(*) AS members FROM group_members WHERE group_id = $1")
            .bind(group.id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?
            .get("members");
        if members > i64::from(group.max_members) {
            return Err(TrackerError::validation(format!(
                "max_members cannot be below the current {} members",
                members
            )));
        }

        sqlx::query(
            r#"
            UPDATE groups
            SET name = $2, description = $3, is_private = $4, max_members = $5,
                invite_code = $6, is_active = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.is_private)
        .bind(to_i32("max_members", group.max_members)?)
        .bind(&group.invite_code)
        .bind(group.is_active)
        .bind(group.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)
    }

    async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> TrackerResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Row lock serializes concurrent joins of the same group
        let row = sqlx::query("SELECT max_members FROM groups WHERE id = $1 FOR UPDATE")
            .bind(group_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
            .ok_or_else(|| TrackerError::not_found("group", group_id))?;
        let max_members = to_u32("max_members", row.get("max_members"))?;

        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS members,
                   COALESCE(BOOL_OR(user_id = $2), FALSE) AS already_member
            FROM group_members
            WHERE group_id = $1
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;
        let members: i64 = row.get("members");
        let already_member: bool = row.get("already_member");

        if already_member {
            return Err(TrackerError::conflict("already a member of this group"));
        }
        if members >= i64::from(max_members) {
            return Err(TrackerError::conflict(format!(
                "group is full ({} members)",
                max_members
            )));
        }

        sqlx::query("INSERT INTO group_members (group_id, user_id) VALUES ($1, $2)")
            .bind(group_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        info!(%group_id, %user_id, members = members + 1, "Membership stored");
        Ok(())
    }

    async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> TrackerResult<bool> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_group_habit(&self, group_id: Uuid, habit_id: Uuid) -> TrackerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO group_habits (group_id, habit_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(group_id)
        .bind(habit_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(())
    }

    async fn remove_group_habit(&self, group_id: Uuid, habit_id: Uuid) -> TrackerResult<bool> {
        let result = sqlx::query("DELETE FROM group_habits WHERE group_id = $1 AND habit_id = $2")
            .bind(group_id)
            .bind(habit_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_groups_for_member(&self, user_id: Uuid) -> TrackerResult<Vec<Group>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM groups g
            JOIN group_members m ON m.group_id = g.id
            WHERE m.user_id = $1 AND g.is_active
            ORDER BY g.created_at
            "#,
            GROUP_COLUMNS
        );
        self.fetch_groups(&sql, Some(user_id)).await
    }

    async fn list_public_groups(&self) -> TrackerResult<Vec<Group>> {
        let sql = format!(
            "SELECT {} FROM groups g WHERE g.is_active AND NOT g.is_private ORDER BY g.created_at",
            GROUP_COLUMNS
        );
        self.fetch_groups(&sql, None).await
    }

    async fn shares_habit_with(&self, user_id: Uuid, habit_id: Uuid) -> TrackerResult<bool> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM group_habits h
                JOIN group_members m ON m.group_id = h.group_id
                JOIN groups g ON g.id = h.group_id
                WHERE m.user_id = $1 AND h.habit_id = $2 AND g.is_active
            ) AS shared
            "#,
        )
        .bind(user_id)
        .bind(habit_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.get("shared"))
    }
}
