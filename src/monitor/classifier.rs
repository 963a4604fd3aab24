//! Health verdicts from an adaptive latency baseline.
//!
//! A responsive probe is DEGRADED when it is slower than twice the rolling
//! mean of that target's recent latencies, but never against a threshold
//! below 1000 ms. Until a target has three samples the 1000 ms floor is used
//! on its own.

use std::collections::{HashMap, VecDeque};
use tracing::warn;

use crate::db::enums::CheckStatus;
use crate::monitor::targets::TargetRegistry;

pub const HISTORY_CAPACITY: usize = 20;
pub const MIN_BASELINE_SAMPLES: usize = 3;
pub const DEGRADED_FLOOR_MS: f64 = 1000.0;

/// Bounded FIFO of recent latencies for one target.
#[derive(Debug, Clone, Default)]
pub struct RollingHistory {
    samples: VecDeque<f64>,
}

impl RollingHistory {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn push(&mut self, response_time_ms: f64) {
        if self.samples.len() == HISTORY_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back(response_time_ms);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.samples.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn samples(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    /// Latency above which a responsive probe counts as DEGRADED.
    pub fn threshold_ms(&self) -> f64 {
        match self.mean() {
            Some(mean) if self.samples.len() >= MIN_BASELINE_SAMPLES => {
                (mean * 2.0).max(DEGRADED_FLOOR_MS)
            }
            _ => DEGRADED_FLOOR_MS,
        }
    }
}

/// Verdict for one probe against a target's history. Does not touch the history.
pub fn classify(
    history: &RollingHistory,
    response_time_ms: f64,
    http_status: Option<u16>,
) -> CheckStatus {
    match http_status {
        None => CheckStatus::Down,
        Some(code) if code >= 500 => CheckStatus::Down,
        Some(_) if response_time_ms > history.threshold_ms() => CheckStatus::Degraded,
        Some(_) => CheckStatus::Healthy,
    }
}

/// One rolling history per known target.
#[derive(Debug, Clone, Default)]
pub struct HistoryTable {
    histories: HashMap<String, RollingHistory>,
}

impl HistoryTable {
    pub fn for_targets(targets: &TargetRegistry) -> Self {
        Self {
            histories: targets
                .iter()
                .map(|t| (t.name.clone(), RollingHistory::new()))
                .collect(),
        }
    }

    #[cfg(test)]
    pub(crate) fn get(&self, service: &str) -> Option<&RollingHistory> {
        self.histories.get(service)
    }

    /// Classifies against the target's history; an unknown target is judged
    /// as if it had no history.
    pub fn classify(
        &self,
        service: &str,
        response_time_ms: f64,
        http_status: Option<u16>,
    ) -> CheckStatus {
        match self.histories.get(service) {
            Some(history) => classify(history, response_time_ms, http_status),
            None => classify(&RollingHistory::default(), response_time_ms, http_status),
        }
    }

    /// Folds a responsive latency into the target's history.
    pub fn observe(&mut self, service: &str, response_time_ms: f64) {
        match self.histories.get_mut(service) {
            Some(history) => history.push(response_time_ms),
            None => warn!(%service, "Latency for unknown target dropped."),
        }
    }
}
