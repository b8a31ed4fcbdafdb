use anyhow::Result;
use common::{
    cache::{RedisConfig, RedisPool},
    database,
};
use tokio::net::TcpListener;
use tracing::{info, warn};

mod error;
mod jwt;
mod middleware;
mod models;
mod oauth;
mod rate_limiter;
mod repositories;
mod routes;
mod session;
mod settings;
mod validation;

use crate::{
    jwt::{JwtConfig, JwtService},
    oauth::{GoogleOAuth, OAuthConfig},
    rate_limiter::{RateLimiter, RateLimiterConfig},
    repositories::UserRepository,
    session::SessionManager,
    settings::AuthSettings,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub user_repository: UserRepository,
    pub sessions: SessionManager,
    pub redis_pool: RedisPool,
    pub rate_limiter: RateLimiter,
    /// `None` when Google sign-in is not configured
    pub google: Option<GoogleOAuth>,
    pub settings: AuthSettings,
}

#[tokio::main]
async fn main() -> Result<()> {
    common::telemetry::init_tracing("auth");

    info!("Starting authentication service");

    let settings = AuthSettings::from_env()?;

    // Initialize database connection pool
    let db_config = database::DatabaseConfig::from_env()?;
    let pool = database::init_pool(&db_config).await?;

    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    if settings.run_migrations {
        database::run_migrations(&pool).await?;
    }

    let redis_config = RedisConfig::from_env()?;
    let redis_pool = RedisPool::new(&redis_config)?;

    let jwt_service = JwtService::new(JwtConfig::from_env()?)?;
    let sessions = SessionManager::new(redis_pool.clone(), jwt_service);
    if !sessions.health_check().await.unwrap_or(false) {
        warn!("Redis is not reachable yet; sessions will fail until it is");
    }

    let google = OAuthConfig::from_env().map(GoogleOAuth::new).transpose()?;
    if google.is_none() {
        info!("Google sign-in disabled");
    }

    let app_state = AppState {
        user_repository: UserRepository::new(pool),
        sessions,
        redis_pool,
        rate_limiter: RateLimiter::new(RateLimiterConfig::default()),
        google,
        settings: settings.clone(),
    };

    let app = routes::create_router(app_state);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    info!("Authentication service listening on {}", settings.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
