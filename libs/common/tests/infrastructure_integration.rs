//! Integration tests for the infrastructure components
//!
//! These need a PostgreSQL database and a Redis server reachable through
//! `DATABASE_URL` and `REDIS_URL`, so they are ignored by default.

use common::{
    cache::{RedisConfig, RedisPool},
    database::{DatabaseConfig, health_check, init_pool, run_migrations},
};
use sqlx::Row;

#[tokio::test]
#[ignore = "requires PostgreSQL and Redis"]
async fn test_migrations_create_the_ledger_tables() -> Result<(), Box<dyn std::error::Error>> {
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;
    assert!(health_check(&pool).await?, "Database health check failed");

    run_migrations(&pool).await?;
    // Second run must be a no-op
    run_migrations(&pool).await?;

    let row = sqlx::query(
        "SELECT COUNT(*) AS tables FROM information_schema.tables \
         WHERE table_name IN ('users', 'habits', 'progress_entries', 'groups', 'group_members')",
    )
    .fetch_one(&pool)
    .await?;
    let tables: i64 = row.get("tables");
    assert_eq!(tables, 5);

    let redis_pool = RedisPool::new(&RedisConfig::from_env()?)?;
    assert!(redis_pool.health_check().await?, "Redis health check failed");

    redis_pool.set("integration", "ok", Some(10)).await?;
    assert_eq!(redis_pool.take("integration").await?, Some("ok".to_string()));

    Ok(())
}
