#![cfg(test)]
use migration::MigratorTrait;
use models::db::{connect_with_config, DATABASE_URL};
use sea_orm::DatabaseConnection;
use tokio::sync::OnceCell;

// Ensure migrations run only once across the entire test process
static MIGRATED: OnceCell<()> = OnceCell::const_new();

/// Connect to the test database and migrate it exactly once per process.
/// Errors (no server, bad URL) bubble up so callers can skip gracefully.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    let mut cfg = configs::DatabaseConfig::default();
    cfg.url = DATABASE_URL.clone();
    cfg.acquire_timeout_secs = 10;
    let db = connect_with_config(&cfg).await?;

    MIGRATED
        .get_or_try_init(|| async {
            migration::Migrator::up(&db, None).await?;
            Ok::<_, anyhow::Error>(())
        })
        .await?;

    Ok(db)
}
