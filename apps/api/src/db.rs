use std::str::FromStr;

use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

/// Creates the SQLite connection pool, creating the database file if needed.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    info!("Opening SQLite database at {database_url}...");

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    // Every connection to `:memory:` is its own database, so an in-memory pool
    // must keep exactly one connection alive.
    let pool = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?
    };

    init_schema(&pool).await?;
    info!("SQLite pool established");
    Ok(pool)
}

/// Creates the single-row tables holding the saved resume and the context.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS saved_resume (
            id                INTEGER PRIMARY KEY CHECK (id = 1),
            source_text       TEXT NOT NULL,
            source_format     TEXT NOT NULL,
            original_filename TEXT NOT NULL,
            saved_at          TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS background_context (
            id         INTEGER PRIMARY KEY CHECK (id = 1),
            body       TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    create_pool("sqlite::memory:").await.unwrap()
}
