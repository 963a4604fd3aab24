//! Drives poll cycles: one immediately at startup, then one per interval.
//!
//! A cycle probes every target in registry order, classifies the outcome,
//! folds responsive latencies into the target's history and appends a check
//! record. At most one cycle is in flight; a tick that arrives while one is
//! running is dropped.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

use crate::db::enums::CheckStatus;
use crate::db::services::CheckRecord;
use crate::monitor::classifier::HistoryTable;
use crate::monitor::probe::Prober;
use crate::monitor::state::MonitorState;
use crate::monitor::targets::Target;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed { checked: usize },
    Skipped,
}

pub struct PollScheduler {
    state: Arc<MonitorState>,
    prober: Arc<dyn Prober>,
    interval: Duration,
}

impl PollScheduler {
    pub fn new(state: Arc<MonitorState>, prober: Arc<dyn Prober>, interval: Duration) -> Self {
        Self {
            state,
            prober,
            interval,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &Arc<MonitorState> {
        &self.state
    }

    /// Runs one full cycle unless another one is already in flight.
    pub async fn poll_all(&self) -> CycleOutcome {
        let Some(mut history) = self.state.try_begin_cycle() else {
            return CycleOutcome::Skipped;
        };

        info!(targets = self.state.targets().len(), "Polling all services...");
        let mut checked = 0;
        for target in self.state.targets().iter() {
            self.check_target(target, &mut history).await;
            checked += 1;
        }
        CycleOutcome::Completed { checked }
    }

    async fn check_target(&self, target: &Target, history: &mut HistoryTable) -> CheckStatus {
        let outcome = self.prober.probe(target).await;
        let status = history.classify(&target.name, outcome.response_time_ms, outcome.http_status);

        if status != CheckStatus::Down {
            history.observe(&target.name, outcome.response_time_ms);
        }

        let record = CheckRecord {
            service: target.name.clone(),
            status,
            response_time_ms: Some(outcome.response_time_ms),
            http_status: outcome.http_status.map(i32::from),
            checked_at: outcome.completed_at,
        };
        if let Err(e) = self.state.repository().append(&record).await {
            error!(service = %target.name, error = %e, "Failed to persist check.");
        }

        info!(
            service = %target.name,
            status = %status,
            response_time_ms = outcome.response_time_ms,
            http_status = ?outcome.http_status,
            "Service checked."
        );
        status
    }

    /// Ticks every interval until `shutdown` flips, spawning a guarded cycle
    /// per tick. The first tick comes one interval after the call; the startup
    /// cycle is the caller's job. Returns only after every spawned cycle has
    /// finished.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(interval_seconds = self.interval.as_secs_f64(), "Poll scheduler started.");
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut cycles = JoinSet::new();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let scheduler = self.clone();
                    cycles.spawn(async move {
                        let started = Utc::now();
                        match scheduler.poll_all().await {
                            CycleOutcome::Completed { checked } => {
                                let elapsed_ms = (Utc::now() - started).num_milliseconds();
                                debug!(checked, elapsed_ms, "Poll cycle finished.");
                            }
                            CycleOutcome::Skipped => {
                                warn!("Previous poll cycle still running; skipping this tick.");
                            }
                        }
                    });
                }
                Some(joined) = cycles.join_next(), if !cycles.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Poll cycle task failed.");
                    }
                }
                _ = shutdown.changed() => {
                    break;
                }
            }
        }

        while let Some(joined) = cycles.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Poll cycle task failed.");
            }
        }
        info!("Poll scheduler stopped.");
    }
}
