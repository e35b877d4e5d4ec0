//! SQLite pool setup and migrations.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Opens (creating if absent) the SQLite database at `database_path` and runs
/// the embedded migrations.
pub async fn init_db(database_path: &str) -> Result<SqlitePool> {
    tracing::info!(path = database_path, "opening database");

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{database_path}"))
        .with_context(|| format!("invalid database path: {database_path}"))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to database at {database_path}"))?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    tracing::info!("database initialized");

    Ok(pool)
}
