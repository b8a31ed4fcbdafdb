//! Shared infrastructure for the habit tracker services
//!
//! This crate provides the pieces both HTTP services need at startup:
//! the PostgreSQL pool and migrations, the Redis cache used for sessions
//! and OAuth state, tracing setup, and the infrastructure error types.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     run_migrations(&pool).await?;
//!     assert!(health_check(&pool).await?);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod database;
pub mod error;
pub mod telemetry;
