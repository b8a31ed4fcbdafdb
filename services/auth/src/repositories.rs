//! Repositories for database operations

mod user;

pub use user::{UserRepository, UserRepositoryError, verify_password};
