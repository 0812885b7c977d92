//! Submission Worker (C3, §4.3): the single long-lived loop that drains
//! pending flags into the upstream game system.

use crate::config::Config;
use flagfarm_db::FlagStore;
use flagfarm_protocol::defaults::{SUBMIT_BACKOFF_SECS, SWEEP_INTERVAL_SECS};
use flagfarm_submit::Submitter;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Duration;

pub struct SubmissionWorker {
    flags: FlagStore,
    submitter: Arc<dyn Submitter>,
    config: Arc<Config>,
}

impl SubmissionWorker {
    pub fn new(flags: FlagStore, submitter: Arc<dyn Submitter>, config: Arc<Config>) -> Self {
        Self {
            flags,
            submitter,
            config,
        }
    }

    /// Runs until `shutdown` reports `true`. `STOP` drains the in-flight
    /// submit call before exiting (§4.3): the shutdown check only happens
    /// at the sleep boundary, never mid-submission.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let lifetime = self.config.lifetime_secs();

        loop {
            let now = chrono::Utc::now().timestamp();
            if let Err(err) = self.flags.sweep_expired(now, lifetime).await {
                tracing::error!(error = %err, "sweep_expired failed");
            }

            let batch = match self.flags.next_pending_batch(self.config.batch_limit).await {
                Ok(batch) => batch,
                Err(err) => {
                    tracing::error!(error = %err, "next_pending_batch failed");
                    Vec::new()
                }
            };

            if batch.is_empty() {
                if self.sleep_or_shutdown(&mut shutdown, Duration::from_secs(self.config.submit_period_secs.max(0) as u64)).await {
                    return;
                }
                continue;
            }

            let now2 = chrono::Utc::now().timestamp();
            let verdicts = self.submitter.submit(&batch).await;

            if verdicts.is_empty() {
                tracing::warn!(batch_len = batch.len(), "submission returned no verdicts, backing off");
                if self.sleep_or_shutdown(&mut shutdown, Duration::from_secs(SUBMIT_BACKOFF_SECS)).await {
                    return;
                }
                continue;
            }

            let recorded = match self.flags.record_verdicts(&verdicts, now2).await {
                Ok(n) => n,
                Err(err) => {
                    tracing::error!(error = %err, "record_verdicts failed");
                    0
                }
            };
            tracing::info!(submitted = batch.len(), recorded, "submission cycle complete");

            let sleep_secs = self.next_sleep_secs(now, lifetime).await;
            if self.sleep_or_shutdown(&mut shutdown, Duration::from_secs(sleep_secs.max(0) as u64)).await {
                return;
            }
        }
    }

    /// `min(submit_period, LIFETIME - (now - oldest_flag.timestamp))` —
    /// shortened so the worker never sleeps past the next flag's expiry.
    async fn next_sleep_secs(&self, now: i64, lifetime: i64) -> i64 {
        let period = self.config.submit_period_secs;
        match self.flags.oldest_pending_timestamp().await {
            Ok(Some(oldest)) => period.min(lifetime - (now - oldest)).max(0),
            _ => period,
        }
    }

    /// Sleeps for `duration` unless shutdown is signalled first. Returns
    /// `true` if the worker should stop.
    async fn sleep_or_shutdown(&self, shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = shutdown.changed() => *shutdown.borrow(),
        }
    }
}

/// Background expiry sweep (§4.1): runs independently of the submission
/// worker's own pre-batch sweep, so flags still age out even while the
/// worker is blocked on a slow upstream call or sleeping out a long
/// `submit_period`.
pub async fn run_periodic_sweep(flags: FlagStore, config: Arc<Config>, mut shutdown: watch::Receiver<bool>) {
    let lifetime = config.lifetime_secs();
    loop {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_secs(SWEEP_INTERVAL_SECS)) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    return;
                }
            }
        }
        if *shutdown.borrow() {
            return;
        }
        let now = chrono::Utc::now().timestamp();
        if let Err(err) = flags.sweep_expired(now, lifetime).await {
            tracing::error!(error = %err, "periodic sweep_expired failed");
        }
    }
}
