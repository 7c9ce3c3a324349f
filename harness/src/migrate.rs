//! Schema migration runner.
//!
//! Grounded on the teacher's `harness/src/migrate.rs`, simplified to a
//! single pool (the source system only needs one Postgres database, unlike
//! the teacher's split state/data stores).

use sqlx::PgPool;

pub async fn run(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!(event = "migrations_applied", "database schema up to date");
    Ok(())
}
