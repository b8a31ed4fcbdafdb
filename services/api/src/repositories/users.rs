use async_trait::async_trait;
use sqlx::{Row, postgres::PgRow};
use tracker::{TrackerResult, User, UserStore};
use uuid::Uuid;

use super::{PgStore, db_error};

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        google_id: row.get("google_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user(&self, id: Uuid) -> TrackerResult<Option<User>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, google_id, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_users(&self, ids: &[Uuid]) -> TrackerResult<Vec<User>> {
        let rows = sqlx::query(
            r#"
            SELECT id, username, email, password_hash, google_id, created_at, updated_at
            FROM users
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.iter().map(user_from_row).collect())
    }
}
