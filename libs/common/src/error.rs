//! Infrastructure error types
//!
//! These cover failures of the shared PostgreSQL and Redis plumbing.
//! Domain failures live in the `tracker` crate.

use redis::RedisError;
use sqlx::Error as SqlxError;
use sqlx::migrate::MigrateError;
use thiserror::Error;

/// Error raised by database pool setup and maintenance
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error occurred during database connection
    #[error("Database connection error: {0}")]
    Connection(#[source] SqlxError),

    /// Error occurred during database query execution
    #[error("Database query error: {0}")]
    Query(#[source] SqlxError),

    /// Error occurred while applying migrations
    #[error("Database migration error: {0}")]
    Migration(#[from] MigrateError),

    /// Configuration error
    #[error("Database configuration error: {0}")]
    Configuration(String),
}

/// Type alias for Result with DatabaseError
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Error raised by the Redis cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// The client could not be created or a connection could not be opened
    #[error("Cache connection error: {0}")]
    Connection(#[source] RedisError),

    /// A command failed on an open connection
    #[error("Cache command error: {0}")]
    Command(#[source] RedisError),

    /// A cached JSON value could not be encoded or decoded
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Type alias for Result with CacheError
pub type CacheResult<T> = Result<T, CacheError>;
