use crate::error::Result;
use sqlx::SqlitePool;

const CREATE_FLAGS: &str = r#"
CREATE TABLE IF NOT EXISTS flags (
    flag                  TEXT PRIMARY KEY,
    exploit               TEXT NOT NULL,
    timestamp             INTEGER NOT NULL,
    status                INTEGER NOT NULL DEFAULT 0,
    submission_timestamp  INTEGER,
    system_message        TEXT
)
"#;

const CREATE_FLAGS_STATUS_IDX: &str =
    "CREATE INDEX IF NOT EXISTS idx_flags_status_ts ON flags(status, timestamp)";

const CREATE_HFI: &str = r#"
CREATE TABLE IF NOT EXISTS hfi (
    delta         TEXT PRIMARY KEY,
    service_name  TEXT NOT NULL,
    port          INTEGER NOT NULL
)
"#;

/// Idempotent schema creation, run once at startup (and by every test that
/// opens an in-memory pool).
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::query(CREATE_FLAGS).execute(pool).await?;
    sqlx::query(CREATE_FLAGS_STATUS_IDX).execute(pool).await?;
    sqlx::query(CREATE_HFI).execute(pool).await?;
    Ok(())
}
