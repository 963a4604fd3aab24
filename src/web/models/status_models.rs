use serde::{Deserialize, Serialize};

use crate::db::enums::CheckStatus;
use crate::db::services::CheckRecord;

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub timestamp: String,
    pub services: Vec<ServiceStatus>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ServiceStatus {
    pub service: String,
    pub status: CheckStatus,
    pub response_time_ms: Option<f64>,
    pub http_status: Option<i32>,
    pub checked_at: Option<String>,
}

impl From<CheckRecord> for ServiceStatus {
    fn from(record: CheckRecord) -> Self {
        Self {
            service: record.service,
            status: record.status,
            response_time_ms: record.response_time_ms,
            http_status: record.http_status,
            checked_at: Some(record.checked_at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}
