use anyhow::Result;
use std::sync::Arc;
use tracing::info;

mod error;
mod middleware;
mod models;
mod repositories;
mod routes;
mod settings;
mod state;

use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
use tracker::Tracker;

use crate::{
    middleware::JwtVerifier, repositories::PgStore, settings::ApiSettings, state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    common::telemetry::init_tracing("api");

    info!("Starting API service");

    let settings = ApiSettings::from_env()?;

    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    if settings.run_migrations {
        run_migrations(&pool).await?;
    }

    let verifier = JwtVerifier::from_env()?;
    let tracker = Tracker::new(Arc::new(PgStore::new(pool.clone())));

    let app_state = AppState {
        tracker,
        verifier,
        db_pool: Some(pool),
    };

    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("API service listening on {}", settings.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
