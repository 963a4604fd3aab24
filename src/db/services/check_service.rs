//! Persistence for check records.
//!
//! Every probe outcome is appended to `monitor_checks`; the status API reads
//! the most recent row per service back out. Nothing here is fatal to the
//! poll loop: callers log and move on when storage is unavailable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Set, Statement,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::db::entities::{monitor_check, prelude::*};
use crate::db::enums::CheckStatus;

pub(crate) const CREATE_MONITOR_CHECKS: &str = r#"
    CREATE TABLE IF NOT EXISTS monitor_checks (
        id SERIAL PRIMARY KEY,
        service VARCHAR(50) NOT NULL,
        status VARCHAR(20) NOT NULL,
        response_time_ms DOUBLE PRECISION,
        http_status INTEGER,
        checked_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

pub(crate) const CREATE_SERVICE_STATE_EVENTS: &str = r#"
    CREATE TABLE IF NOT EXISTS service_state_events (
        id SERIAL PRIMARY KEY,
        service VARCHAR(50) NOT NULL,
        state VARCHAR(20) NOT NULL,
        delay_ms DOUBLE PRECISION,
        changed_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

const CREATE_LATEST_INDEX: &str = r#"
    CREATE INDEX IF NOT EXISTS idx_monitor_checks_service_checked_at
    ON monitor_checks (service, checked_at DESC)
"#;

const LATEST_PER_SERVICE: &str = r#"
    SELECT DISTINCT ON (service)
        id, service, status, response_time_ms, http_status, checked_at
    FROM monitor_checks
    WHERE service = ANY($1)
    ORDER BY service, checked_at DESC, id DESC
"#;

/// One probe outcome as it is stored and reported.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckRecord {
    pub service: String,
    pub status: CheckStatus,
    pub response_time_ms: Option<f64>,
    pub http_status: Option<i32>,
    pub checked_at: DateTime<Utc>,
}

impl From<monitor_check::Model> for CheckRecord {
    fn from(model: monitor_check::Model) -> Self {
        Self {
            service: model.service,
            status: model.status,
            response_time_ms: model.response_time_ms,
            http_status: model.http_status,
            checked_at: model.checked_at,
        }
    }
}

impl CheckRecord {
    fn into_active_model(self) -> monitor_check::ActiveModel {
        monitor_check::ActiveModel {
            service: Set(self.service),
            status: Set(self.status),
            response_time_ms: Set(self.response_time_ms),
            http_status: Set(self.http_status),
            checked_at: Set(self.checked_at),
            ..Default::default()
        }
    }
}

/// Storage seam shared by the poll loop and the status API.
///
/// Implementations must tolerate concurrent calls from both.
#[async_trait]
pub trait CheckRepository: Send + Sync {
    /// Create the schema if it does not exist yet. Safe to call repeatedly.
    async fn init_schema(&self) -> Result<(), DbErr>;

    /// Append a single record. Records are never updated or deleted.
    async fn append(&self, record: &CheckRecord) -> Result<(), DbErr>;

    /// Most recent record per service among `services`, in the order given.
    /// Services without any stored record are left out.
    async fn latest_per_target(&self, services: &[String]) -> Result<Vec<CheckRecord>, DbErr>;
}

/// Postgres-backed repository over a pooled sea-orm connection.
///
/// The connection is shared rather than cloned so the pool can be closed
/// once every holder is gone.
pub struct SeaOrmCheckRepository {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmCheckRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CheckRepository for SeaOrmCheckRepository {
    async fn init_schema(&self) -> Result<(), DbErr> {
        for ddl in [
            CREATE_MONITOR_CHECKS,
            CREATE_SERVICE_STATE_EVENTS,
            CREATE_LATEST_INDEX,
        ] {
            self.db.execute_unprepared(ddl).await?;
        }
        Ok(())
    }

    async fn append(&self, record: &CheckRecord) -> Result<(), DbErr> {
        MonitorCheck::insert(record.clone().into_active_model())
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn latest_per_target(&self, services: &[String]) -> Result<Vec<CheckRecord>, DbErr> {
        if services.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<monitor_check::Model> = MonitorCheck::find()
            .from_raw_sql(Statement::from_sql_and_values(
                self.db.get_database_backend(),
                LATEST_PER_SERVICE,
                [services.to_vec().into()],
            ))
            .all(self.db.as_ref())
            .await?;

        Ok(order_by_services(rows.into_iter().map(CheckRecord::from), services))
    }
}

/// Keeps one record per requested service, in the requested order.
pub(crate) fn order_by_services(
    records: impl IntoIterator<Item = CheckRecord>,
    services: &[String],
) -> Vec<CheckRecord> {
    let mut by_service: HashMap<String, CheckRecord> = HashMap::new();
    for record in records {
        match by_service.get(&record.service) {
            Some(existing) if existing.checked_at >= record.checked_at => {}
            _ => {
                by_service.insert(record.service.clone(), record);
            }
        }
    }

    services
        .iter()
        .filter_map(|service| by_service.remove(service))
        .collect()
}

/// Runs `init_schema` until it succeeds or `max_attempts` is used up,
/// sleeping `backoff` between failures.
///
/// Returns whether the schema was confirmed. Exhaustion is logged, not raised:
/// the monitor keeps running and later writes fail individually.
pub async fn init_schema_with_retry(
    repository: &dyn CheckRepository,
    max_attempts: u32,
    backoff: Duration,
) -> bool {
    for attempt in 1..=max_attempts {
        match repository.init_schema().await {
            Ok(()) => {
                info!(attempt, "Database schema initialized.");
                return true;
            }
            Err(e) => {
                warn!(attempt, max_attempts, error = %e, "Database not ready.");
                if attempt < max_attempts {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
    warn!(
        max_attempts,
        "Giving up on schema initialization; continuing without a confirmed schema."
    );
    false
}
