use axum::{Json, Router, extract::State, routing::get};
use chrono::Utc;
use std::sync::Arc;
use tracing::error;

use crate::web::models::{HealthResponse, ServiceStatus, StatusResponse};
use crate::web::{AppError, AppState};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

pub fn create_status_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status))
        .route("/health", get(get_health))
}

/// Latest stored check per target, straight from the database.
#[axum::debug_handler]
async fn get_status(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, AppError> {
    let names = app_state.targets.names();
    let latest = app_state
        .repository
        .latest_per_target(&names)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to read latest checks for /status.");
            AppError::from(e)
        })?;

    Ok(Json(StatusResponse {
        timestamp: Utc::now()
            .with_timezone(&app_state.display_offset)
            .format(TIMESTAMP_FORMAT)
            .to_string(),
        services: latest.into_iter().map(ServiceStatus::from).collect(),
    }))
}

async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        service: "monitor".to_string(),
    })
}
