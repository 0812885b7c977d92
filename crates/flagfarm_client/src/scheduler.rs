//! Wave Scheduler (C6, §4.6): runs every team's exploit once per wave on a
//! bounded worker pool, with per-team failure backoff and a worker-pool
//! size that adapts to how long the previous wave actually took.

use crate::remote::RemoteSession;
use crate::runner::{self, RunFailure};
use crate::uploader::FlagUploader;
use rand::Rng;
use regex::Regex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex, Semaphore};

pub struct SchedulerConfig {
    pub exploit_path: PathBuf,
    pub interpreter: Option<String>,
    pub timeout: Duration,
    pub failure_threshold: u32,
    pub max_failures: u32,
    pub always_retry: bool,
}

pub struct Scheduler {
    config: SchedulerConfig,
    session: Arc<RemoteSession>,
    uploader: Arc<FlagUploader>,
    cpu_count: usize,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, session: Arc<RemoteSession>, uploader: Arc<FlagUploader>) -> Self {
        Self {
            config,
            session,
            uploader,
            cpu_count: num_cpus::get().max(1),
        }
    }

    /// Decides whether `team` should be attempted this wave. A team with no
    /// prior failures always runs; otherwise it rolls `0..=counter` and
    /// skips when that roll clears the configured failure threshold —
    /// `--always-retry` disables the skip entirely.
    fn should_attempt(&self, counter: u32) -> bool {
        if self.config.always_retry || counter == 0 {
            return true;
        }
        let roll = rand::thread_rng().gen_range(0..=counter);
        roll <= self.config.failure_threshold
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let failure_counts: Arc<Mutex<HashMap<String, u32>>> = Arc::new(Mutex::new(HashMap::new()));
        let mut n_workers = self.cpu_count;
        let mut deadline = Duration::from_secs(30);

        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            let remote_config = match self.session.fetch_config().await {
                Ok(remote_config) => Some(remote_config),
                Err(err) => {
                    tracing::warn!(error = %err, "could not refresh remote config, reusing last known values");
                    None
                }
            };
            let teams = remote_config
                .as_ref()
                .map(|cfg| cfg.teams.clone())
                .unwrap_or_default();
            if let Some(cfg) = &remote_config {
                deadline = Duration::from_secs_f64(cfg.tick_duration.max(1) as f64 * 0.5);
            }
            let flag_regex = match remote_config.as_ref().map(|cfg| Regex::new(&cfg.flag_format)) {
                Some(Ok(regex)) => regex,
                _ => Regex::new(flagfarm_protocol::defaults::DEFAULT_FLAG_FORMAT).expect("default flag format compiles"),
            };

            if teams.is_empty() {
                tracing::warn!("wave scheduler has no teams to target, sleeping");
                if self.sleep_or_shutdown(&mut shutdown, deadline).await {
                    return Ok(());
                }
                continue;
            }

            let wave_start = Instant::now();
            tracing::info!(teams = teams.len(), n_workers, "wave starting");

            let semaphore = Arc::new(Semaphore::new(n_workers));
            let mut handles = Vec::with_capacity(teams.len());

            for team in teams.iter().cloned() {
                let counter = *failure_counts.lock().await.get(&team).unwrap_or(&0);
                if !self.should_attempt(counter) {
                    tracing::debug!(team, counter, "skipping team this wave (backoff)");
                    continue;
                }

                let semaphore = semaphore.clone();
                let exploit_path = self.config.exploit_path.clone();
                let interpreter = self.config.interpreter.clone();
                let timeout = self.config.timeout;
                let flag_regex = flag_regex.clone();
                let failure_counts = failure_counts.clone();
                let uploader = self.uploader.clone();
                let max_failures = self.config.max_failures;
                let failure_threshold = self.config.failure_threshold;

                handles.push(tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                    let outcome = runner::run_exploit(&exploit_path, &team, timeout, &flag_regex, interpreter.as_deref()).await;

                    let mut counts = failure_counts.lock().await;
                    let entry = counts.entry(team.clone()).or_insert(0);
                    match outcome {
                        Ok(run_outcome) => {
                            if run_outcome.flags.is_empty() {
                                tracing::debug!(team, "run succeeded, no flags captured");
                            } else {
                                *entry = on_success(*entry, failure_threshold);
                                tracing::info!(team, flags = run_outcome.flags.len(), "flags captured");
                                drop(counts);
                                uploader.push(run_outcome.flags).await;
                            }
                        }
                        Err(failure) => {
                            *entry = on_failure(*entry, max_failures);
                            match failure {
                                RunFailure::TimedOut => tracing::warn!(team, "exploit timed out"),
                                RunFailure::Crashed => tracing::warn!(team, "exploit exited non-zero"),
                                RunFailure::UnknownInterpreter => {
                                    tracing::error!(team, "exploit is not executable and no interpreter is configured")
                                }
                                RunFailure::SpawnFailed(reason) => tracing::error!(team, reason, "failed to spawn exploit"),
                            }
                        }
                    }
                }));
            }

            for handle in handles {
                let _ = handle.await;
            }

            let uploaded = self.uploader.flush().await;
            tracing::info!(uploaded, "wave uploaded flags");

            let wave_time = wave_start.elapsed();
            n_workers = self.resize_pool(n_workers, teams.len(), wave_time, deadline);

            let remaining = deadline.saturating_sub(wave_time);
            if self.sleep_or_shutdown(&mut shutdown, remaining).await {
                return Ok(());
            }
        }
    }

    /// `teams_per_worker = ceil(teams/n_workers)`,
    /// `time_per_team = wave_time/teams_per_worker`,
    /// `n_workers' = ceil(time_per_team * teams / deadline)`, clamped to
    /// `[1, cpu_count]`.
    fn resize_pool(&self, n_workers: usize, teams: usize, wave_time: Duration, deadline: Duration) -> usize {
        if teams == 0 || deadline.is_zero() {
            return n_workers;
        }
        let teams_per_worker = (teams as f64 / n_workers.max(1) as f64).ceil().max(1.0);
        let time_per_team = wave_time.as_secs_f64() / teams_per_worker;
        let ideal = (time_per_team * teams as f64 / deadline.as_secs_f64()).ceil();
        (ideal as usize).clamp(1, self.cpu_count)
    }

    async fn sleep_or_shutdown(&self, shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => false,
            _ = shutdown.changed() => *shutdown.borrow(),
        }
    }
}

/// A run that actually captured flags clamps the counter back to
/// `failure_threshold` if it was above it ("give it another chance"),
/// otherwise decrements by one, never below zero. A zero-exit run with no
/// flags captured is a soft event (§9 S5) and leaves the counter untouched —
/// only called from the non-empty branch at the call site.
fn on_success(counter: u32, failure_threshold: u32) -> u32 {
    if counter > failure_threshold {
        failure_threshold
    } else {
        counter.saturating_sub(1)
    }
}

/// A failed run increments the counter, capped at `max_failures`.
fn on_failure(counter: u32, max_failures: u32) -> u32 {
    (counter + 1).min(max_failures)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_failure_counter_saturates_at_max_failures() {
        let mut counter = 0u32;
        for _ in 0..20 {
            counter = on_failure(counter, 12);
        }
        assert_eq!(counter, 12);
    }

    #[test]
    fn s4_success_clamps_down_to_threshold_not_zero() {
        // Team at max_failures=12 after a long losing streak, threshold=4.
        let counter = on_success(12, 4);
        assert_eq!(counter, 4, "clamp to the threshold, not an 11-style single decrement");
    }

    #[test]
    fn success_below_threshold_decrements_by_one() {
        assert_eq!(on_success(3, 4), 2);
    }

    #[test]
    fn success_at_zero_is_a_no_op() {
        assert_eq!(on_success(0, 4), 0);
    }

    #[test]
    fn success_exactly_at_threshold_decrements_by_one() {
        // Only counters strictly greater than the threshold get clamped;
        // sitting exactly at it behaves like any other in-range value.
        assert_eq!(on_success(4, 4), 3);
    }
}
