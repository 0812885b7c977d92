use crate::error::{DbError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Builds a pooled connection to the flag store's SQLite file.
///
/// WAL mode plus `synchronous=NORMAL` is what gives the single-writer /
/// multi-reader contract of §5 for free: SQLite itself serializes writers
/// across every connection in the pool, while readers proceed against the
/// WAL without blocking on them.
pub async fn create_pool(database: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{database}"))
        .map_err(DbError::Sqlx)?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    apply_pragmas(&pool).await?;
    Ok(pool)
}

pub async fn create_pool_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    apply_pragmas(&pool).await?;
    Ok(pool)
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA journal_mode=WAL").execute(pool).await?;
    sqlx::query("PRAGMA synchronous=NORMAL")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA foreign_keys=ON").execute(pool).await?;
    Ok(())
}
