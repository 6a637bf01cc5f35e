use anyhow::Result;
use sqlx::PgPool;

/// Apply the entity table migrations shipped in `backend/migrations`.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Entity migrations applied");
    Ok(())
}
