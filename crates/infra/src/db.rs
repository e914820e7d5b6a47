//! Database wiring: connection pool + schema bootstrap.

use sqlx::PgPool;
use tracing::info;

const SCHEMA: &str = include_str!("../migrations/0001_init.sql");
// Contains a plpgsql body, so it runs as one multi-statement script.
const PRODUCTS_NOTIFY: &str = include_str!("../migrations/0002_products_notify.sql");

/// Connect and make sure the tables exist.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPool::connect(database_url).await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Apply the bundled schema and the `products` change trigger. Safe to rerun.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in schema_statements() {
        sqlx::query(statement).execute(pool).await?;
    }
    sqlx::raw_sql(PRODUCTS_NOTIFY).execute(pool).await?;
    info!("database schema ensured");
    Ok(())
}

fn schema_statements() -> impl Iterator<Item = &'static str> {
    SCHEMA.split(';').filter(|s| has_sql(s)).map(str::trim)
}

fn has_sql(chunk: &str) -> bool {
    chunk
        .lines()
        .any(|l| !l.trim().is_empty() && !l.trim_start().starts_with("--"))
}
