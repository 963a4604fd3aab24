use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::db::services::CheckRepository;
use crate::monitor::classifier::HistoryTable;
use crate::monitor::targets::TargetRegistry;

/// Long-lived monitor state, built once at startup and shared by handle.
///
/// The history table sits behind the poll-cycle lock: whoever holds the lock
/// is the only running cycle, and the only writer of the table. The status
/// API never touches it and reads from the repository instead.
pub struct MonitorState {
    targets: TargetRegistry,
    history: Mutex<HistoryTable>,
    repository: Arc<dyn CheckRepository>,
}

impl MonitorState {
    pub fn new(targets: TargetRegistry, repository: Arc<dyn CheckRepository>) -> Self {
        let history = HistoryTable::for_targets(&targets);
        Self {
            targets,
            history: Mutex::new(history),
            repository,
        }
    }

    pub fn targets(&self) -> &TargetRegistry {
        &self.targets
    }

    pub fn repository(&self) -> &Arc<dyn CheckRepository> {
        &self.repository
    }

    /// Claims the poll cycle without waiting. `None` while another cycle runs.
    pub fn try_begin_cycle(&self) -> Option<MutexGuard<'_, HistoryTable>> {
        self.history.try_lock().ok()
    }
}
