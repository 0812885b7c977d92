//! Checker record storage (§3) backing the Artifact Store's host-faking
//! registry. Opaque to the core: the store only keeps, de-duplicates, and
//! lists them by `delta`.

use crate::error::Result;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, FromRow)]
pub struct CheckerRecord {
    pub service_name: String,
    pub port: i64,
    pub delta: String,
}

#[derive(Clone)]
pub struct HfiRegistry {
    pool: SqlitePool,
}

impl HfiRegistry {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, record: &CheckerRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO hfi (delta, service_name, port) VALUES (?, ?, ?) \
             ON CONFLICT(delta) DO UPDATE SET service_name = excluded.service_name, port = excluded.port",
        )
        .bind(&record.delta)
        .bind(&record.service_name)
        .bind(record.port)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<CheckerRecord>> {
        let rows = sqlx::query_as("SELECT delta, service_name, port FROM hfi ORDER BY delta")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_deduplicates_by_delta() {
        let pool = crate::pool::create_pool_in_memory().await.unwrap();
        crate::schema::migrate(&pool).await.unwrap();
        let registry = HfiRegistry::new(pool);

        registry
            .upsert(&CheckerRecord {
                service_name: "web".into(),
                port: 8080,
                delta: "d1".into(),
            })
            .await
            .unwrap();
        registry
            .upsert(&CheckerRecord {
                service_name: "web-v2".into(),
                port: 8081,
                delta: "d1".into(),
            })
            .await
            .unwrap();

        let all = registry.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].service_name, "web-v2");
        assert_eq!(all[0].port, 8081);
    }
}
