//! The Flag Store (§4.1): the only component allowed to touch the `flags`
//! table directly.

use crate::error::{DbError, Result};
use flagfarm_protocol::defaults::EXPIRED_MESSAGE;
use flagfarm_protocol::{Flag, FlagStatus, Verdict};
use sqlx::{FromRow, SqlitePool};

#[derive(FromRow)]
struct FlagRow {
    flag: String,
    exploit: String,
    timestamp: i64,
    status: i64,
    submission_timestamp: Option<i64>,
    system_message: Option<String>,
}

impl FlagRow {
    fn into_flag(self, lifetime: Option<i64>) -> Flag {
        Flag {
            flag: self.flag,
            exploit: self.exploit,
            timestamp: self.timestamp,
            status: FlagStatus::from_i64(self.status).unwrap_or(FlagStatus::Unknown),
            submission_timestamp: self.submission_timestamp,
            system_message: self.system_message,
            lifetime,
        }
    }
}

#[derive(Clone)]
pub struct FlagStore {
    pool: SqlitePool,
}

impl FlagStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts each flag as `PENDING` under `exploit`. Flags that already
    /// exist (by primary key) are left untouched — first-wins, idempotent.
    /// Returns the number of rows actually inserted.
    pub async fn insert_many(&self, flags: &[(String, i64)], exploit: &str) -> Result<u64> {
        if flags.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;
        for (flag, timestamp) in flags {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO flags (flag, exploit, timestamp, status) VALUES (?, ?, ?, 0)",
            )
            .bind(flag)
            .bind(exploit)
            .bind(timestamp)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// Writes back upstream verdicts. Only rows still `PENDING` are
    /// touched — a flag that has already left `PENDING` (e.g. the sweeper
    /// beat the worker to it) keeps its terminal status.
    pub async fn record_verdicts(&self, verdicts: &[Verdict], now: i64) -> Result<u64> {
        if verdicts.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut updated = 0u64;
        for verdict in verdicts {
            let status = verdict.status.into_flag_status().as_i64();
            let result = sqlx::query(
                "UPDATE flags SET status = ?, submission_timestamp = ?, system_message = ? \
                 WHERE flag = ? AND status = 0",
            )
            .bind(status)
            .bind(now)
            .bind(&verdict.message)
            .bind(&verdict.flag)
            .execute(&mut *tx)
            .await?;
            updated += result.rows_affected();
        }
        tx.commit().await?;
        Ok(updated)
    }

    /// Up to `limit` pending flags, oldest (soonest to expire) first.
    pub async fn next_pending_batch(&self, limit: i64) -> Result<Vec<Flag>> {
        let rows: Vec<FlagRow> = sqlx::query_as(
            "SELECT flag, exploit, timestamp, status, submission_timestamp, system_message \
             FROM flags WHERE status = 0 ORDER BY timestamp ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into_flag(None)).collect())
    }

    /// Marks every `PENDING` row past `lifetime_secs` as `EXPIRED`. Never
    /// resurrects a row already in a terminal state. Returns rows touched.
    pub async fn sweep_expired(&self, now: i64, lifetime_secs: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE flags SET status = 1, submission_timestamp = ?, system_message = ? \
             WHERE status = 0 AND (timestamp + ?) <= ?",
        )
        .bind(now)
        .bind(EXPIRED_MESSAGE)
        .bind(lifetime_secs)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Paginated read, newest first, each row carrying a derived `lifetime`.
    pub async fn page(&self, offset: i64, count: i64, now: i64) -> Result<Vec<Flag>> {
        if count > 100 {
            return Err(DbError::invalid("count must be <= 100"));
        }

        let rows: Vec<FlagRow> = sqlx::query_as(
            "SELECT flag, exploit, timestamp, status, submission_timestamp, system_message \
             FROM flags ORDER BY timestamp DESC LIMIT ? OFFSET ?",
        )
        .bind(count)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let lifetime = r.submission_timestamp.unwrap_or(now) - r.timestamp;
                r.into_flag(Some(lifetime))
            })
            .collect())
    }

    /// Oldest `timestamp` among `PENDING` rows, used by the submission
    /// worker to size its next sleep (§4.3 step 6).
    pub async fn oldest_pending_timestamp(&self) -> Result<Option<i64>> {
        let min_ts: Option<i64> =
            sqlx::query_scalar("SELECT MIN(timestamp) FROM flags WHERE status = 0")
                .fetch_one(&self.pool)
                .await?;
        Ok(min_ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flagfarm_protocol::VerdictStatus;

    async fn setup() -> FlagStore {
        let pool = crate::pool::create_pool_in_memory().await.unwrap();
        crate::schema::migrate(&pool).await.unwrap();
        FlagStore::new(pool)
    }

    #[tokio::test]
    async fn insert_many_is_idempotent() {
        let store = setup().await;
        let n1 = store
            .insert_many(&[("AAAA=".into(), 1000)], "sqli")
            .await
            .unwrap();
        let n2 = store
            .insert_many(&[("AAAA=".into(), 2000)], "other")
            .await
            .unwrap();
        assert_eq!(n1, 1);
        assert_eq!(n2, 0);

        let batch = store.next_pending_batch(10).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].exploit, "sqli");
        assert_eq!(batch[0].timestamp, 1000);
    }

    #[tokio::test]
    async fn next_pending_batch_orders_oldest_first() {
        let store = setup().await;
        store
            .insert_many(
                &[
                    ("BBBB=".into(), 300),
                    ("AAAA=".into(), 100),
                    ("CCCC=".into(), 200),
                ],
                "sqli",
            )
            .await
            .unwrap();

        let batch = store.next_pending_batch(10).await.unwrap();
        let timestamps: Vec<i64> = batch.iter().map(|f| f.timestamp).collect();
        assert_eq!(timestamps, vec![100, 200, 300]);
    }

    #[tokio::test]
    async fn record_verdicts_only_touches_pending_rows() {
        let store = setup().await;
        store
            .insert_many(&[("AAAA=".into(), 1000)], "sqli")
            .await
            .unwrap();

        let verdict = Verdict {
            flag: "AAAA=".into(),
            status: VerdictStatus::Accepted,
            message: Some("nice".into()),
        };
        let updated = store.record_verdicts(&[verdict.clone()], 1005).await.unwrap();
        assert_eq!(updated, 1);

        // Second verdict for the same flag must not overwrite — it's no
        // longer PENDING.
        let second = Verdict {
            flag: "AAAA=".into(),
            status: VerdictStatus::Rejected,
            message: Some("too late".into()),
        };
        let updated = store.record_verdicts(&[second], 1010).await.unwrap();
        assert_eq!(updated, 0);

        let page = store.page(0, 10, 1020).await.unwrap();
        assert_eq!(page[0].status, FlagStatus::Accepted);
        assert_eq!(page[0].system_message.as_deref(), Some("nice"));
    }

    #[tokio::test]
    async fn sweep_expired_marks_old_pending_rows() {
        let store = setup().await;
        store
            .insert_many(&[("AAAA=".into(), 0)], "sqli")
            .await
            .unwrap();

        let touched = store.sweep_expired(5, 10).await.unwrap();
        assert_eq!(touched, 0, "not yet past lifetime");

        let touched = store.sweep_expired(11, 10).await.unwrap();
        assert_eq!(touched, 1);

        let batch = store.next_pending_batch(10).await.unwrap();
        assert!(batch.is_empty());

        let page = store.page(0, 10, 11).await.unwrap();
        assert_eq!(page[0].status, FlagStatus::Expired);
        assert_eq!(page[0].system_message.as_deref(), Some(EXPIRED_MESSAGE));
    }

    #[tokio::test]
    async fn sweep_never_resurrects_a_terminal_row() {
        let store = setup().await;
        store
            .insert_many(&[("AAAA=".into(), 0)], "sqli")
            .await
            .unwrap();
        store
            .record_verdicts(
                &[Verdict {
                    flag: "AAAA=".into(),
                    status: VerdictStatus::Accepted,
                    message: None,
                }],
                1,
            )
            .await
            .unwrap();

        store.sweep_expired(100, 10).await.unwrap();

        let page = store.page(0, 10, 100).await.unwrap();
        assert_eq!(page[0].status, FlagStatus::Accepted);
    }

    #[tokio::test]
    async fn page_rejects_count_over_100() {
        let store = setup().await;
        let err = store.page(0, 101, 0).await.unwrap_err();
        assert!(matches!(err, DbError::InvalidArgument(_)));
    }
}
