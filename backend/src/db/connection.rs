use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Type alias so downstream code can reference the logical database pool in a single place.
pub type DbPool = PgPool;

/// Builds the pool with bounded acquire and statement time so a wedged store
/// call cannot hold a handler forever.
pub async fn create_pool(database_url: &str, statement_timeout_secs: u64) -> anyhow::Result<DbPool> {
    let options = PgConnectOptions::from_str(database_url)?
        .options([("statement_timeout", format!("{}s", statement_timeout_secs))]);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(statement_timeout_secs))
        .connect_with(options)
        .await?;

    Ok(pool)
}
