//! In-memory stand-ins for the probe and storage seams.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::DbErr;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::db::services::check_service::order_by_services;
use crate::db::services::{CheckRecord, CheckRepository};
use crate::monitor::probe::{ProbeOutcome, Prober};
use crate::monitor::targets::Target;

pub fn outcome(http_status: Option<u16>, response_time_ms: f64) -> ProbeOutcome {
    ProbeOutcome {
        http_status,
        response_time_ms,
        completed_at: Utc::now(),
    }
}

/// Answers from a per-target script, then 200 in 50 ms once the script runs out.
#[derive(Default)]
pub struct FakeProber {
    scripts: Mutex<HashMap<String, VecDeque<ProbeOutcome>>>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
}

impl FakeProber {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Default::default()
        }
    }

    pub fn script(&self, service: &str, outcomes: impl IntoIterator<Item = ProbeOutcome>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(service.to_string())
            .or_default()
            .extend(outcomes);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Prober for FakeProber {
    async fn probe(&self, target: &Target) -> ProbeOutcome {
        self.calls.lock().unwrap().push(target.name.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&target.name)
            .and_then(|queue| queue.pop_front());
        scripted.unwrap_or_else(|| outcome(Some(200), 50.0))
    }
}

#[derive(Default)]
pub struct FakeRepository {
    records: Mutex<Vec<CheckRecord>>,
    failing_services: Mutex<HashSet<String>>,
    append_attempts: Mutex<usize>,
    schema_failures_left: Mutex<u32>,
    schema_attempts: Mutex<u32>,
    fail_reads: Mutex<bool>,
}

impl FakeRepository {
    pub fn with_records(records: impl IntoIterator<Item = CheckRecord>) -> Self {
        let repo = Self::default();
        repo.records.lock().unwrap().extend(records);
        repo
    }

    pub fn fail_appends_for(&self, service: &str) {
        self.failing_services
            .lock()
            .unwrap()
            .insert(service.to_string());
    }

    pub fn fail_schema_times(&self, times: u32) {
        *self.schema_failures_left.lock().unwrap() = times;
    }

    pub fn fail_reads(&self) {
        *self.fail_reads.lock().unwrap() = true;
    }

    pub fn records(&self) -> Vec<CheckRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn append_attempts(&self) -> usize {
        *self.append_attempts.lock().unwrap()
    }

    pub fn schema_attempts(&self) -> u32 {
        *self.schema_attempts.lock().unwrap()
    }
}

#[async_trait]
impl CheckRepository for FakeRepository {
    async fn init_schema(&self) -> Result<(), DbErr> {
        *self.schema_attempts.lock().unwrap() += 1;
        let mut left = self.schema_failures_left.lock().unwrap();
        if *left > 0 {
            *left -= 1;
            return Err(DbErr::Custom("database is starting up".to_string()));
        }
        Ok(())
    }

    async fn append(&self, record: &CheckRecord) -> Result<(), DbErr> {
        *self.append_attempts.lock().unwrap() += 1;
        if self.failing_services.lock().unwrap().contains(&record.service) {
            return Err(DbErr::Custom("insert rejected".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn latest_per_target(&self, services: &[String]) -> Result<Vec<CheckRecord>, DbErr> {
        if *self.fail_reads.lock().unwrap() {
            return Err(DbErr::Custom("connection refused".to_string()));
        }
        Ok(order_by_services(self.records(), services))
    }
}
