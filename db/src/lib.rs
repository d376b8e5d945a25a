use color_eyre::{eyre::WrapErr, Result};
use sqlx::postgres::PgPoolOptions;

pub mod cooking;
pub mod subscriptions;
pub mod users;

pub use sqlx;
pub use sqlx::PgPool;

const MIGRATION_LOCK_ID: i64 = 0xF0_0D_F0_0D_F0_0D;

#[tracing::instrument(skip(database_url), err)]
pub async fn setup_db_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .wrap_err("Failed to connect to Postgres")?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Applies the embedded migrations while holding a Postgres advisory lock, so
/// several instances booting at once do not race each other.
///
/// The lock is session scoped, which is why everything runs on one pooled
/// connection.
#[tracing::instrument(skip(pool), err)]
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let mut conn = pool.acquire().await?;

    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(MIGRATION_LOCK_ID)
        .execute(&mut *conn)
        .await?;

    let migrated = sqlx::migrate!().run(&mut *conn).await;

    let unlocked: Option<bool> = sqlx::query_scalar("SELECT pg_advisory_unlock($1)")
        .bind(MIGRATION_LOCK_ID)
        .fetch_one(&mut *conn)
        .await?;

    if unlocked == Some(true) {
        tracing::info!("Migration lock unlocked");
    } else {
        tracing::warn!("Failed to unlock migration lock");
    }

    migrated.wrap_err("Failed to run migrations")
}
