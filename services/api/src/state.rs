//! Application state shared across handlers

use sqlx::PgPool;
use tracker::Tracker;

use crate::middleware::JwtVerifier;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Tracker,
    pub verifier: JwtVerifier,
    /// Checked by `/health`; absent when the tracker runs on another store
    pub db_pool: Option<PgPool>,
}
