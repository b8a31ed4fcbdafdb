//! User repository for database operations

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};
use thiserror::Error;
use tracing::info;
use tracker::User;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum UserRepositoryError {
    /// Username, email or Google account already registered
    #[error("{0} is already registered")]
    Duplicate(&'static str),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

type RepoResult<T> = Result<T, UserRepositoryError>;

/// Hash a password with Argon2id and a random salt
pub fn hash_password(password: &str) -> RepoResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserRepositoryError::PasswordHash(e.to_string()))
}

/// False for accounts without a password (Google only) or unparsable hashes
pub fn verify_password(user: &User, password: &str) -> bool {
    let Some(stored) = user.password_hash.as_deref() else {
        return false;
    };
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

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

/// Name the unique constraint a violation came from
fn duplicate(err: sqlx::Error) -> UserRepositoryError {
    let field = err
        .as_database_error()
        .filter(|db| db.is_unique_violation())
        .map(|db| match db.constraint() {
            Some(c) if c.contains("email") => "email",
            Some(c) if c.contains("google") => "Google account",
            _ => "username",
        });
    match field {
        Some(field) => UserRepositoryError::Duplicate(field),
        None => UserRepositoryError::Database(err),
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, google_id, created_at, updated_at";

/// User repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, user: &User) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, google_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.google_id)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(duplicate)?;
        Ok(())
    }

    /// Register a username/password account
    pub async fn create_local(&self, username: &str, email: &str, password: &str) -> RepoResult<User> {
        info!("Creating new user: {}", username);

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: Some(hash_password(password)?),
            google_id: None,
            created_at: now,
            updated_at: now,
        };
        self.insert(&user).await?;
        Ok(user)
    }

    /// Register an account that signs in through Google only
    pub async fn create_google(&self, username: &str, email: &str, google_id: &str) -> RepoResult<User> {
        info!("Creating new Google user: {}", username);

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: None,
            google_id: Some(google_id.to_string()),
            created_at: now,
            updated_at: now,
        };
        self.insert(&user).await?;
        Ok(user)
    }

    async fn find_one(&self, column: &str, value: &str) -> RepoResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE {} = $1",
            USER_COLUMNS, column
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    /// Find a user by username or email
    pub async fn find_by_login(&self, username_or_email: &str) -> RepoResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = $1 OR email = $1",
            USER_COLUMNS
        ))
        .bind(username_or_email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.find_one("email", email).await
    }

    pub async fn find_by_google_id(&self, google_id: &str) -> RepoResult<Option<User>> {
        self.find_one("google_id", google_id).await
    }

    pub async fn username_taken(&self, username: &str) -> RepoResult<bool> {
        Ok(self.find_one("username", username).await?.is_some())
    }

    pub async fn find_by_id(&self, id: Uuid) -> RepoResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    /// Attach a Google account to an existing user
    pub async fn link_google_id(&self, user_id: Uuid, google_id: &str) -> RepoResult<User> {
        info!(%user_id, "Linking Google account");

        let row = sqlx::query(&format!(
            "UPDATE users SET google_id = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(google_id)
        .fetch_one(&self.pool)
        .await
        .map_err(duplicate)?;
        Ok(user_from_row(&row))
    }
}
