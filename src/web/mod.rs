use axum::{Router, http::Method, http::Uri};
use chrono::FixedOffset;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::db::services::CheckRepository;
use crate::monitor::targets::TargetRegistry;

pub mod error;
pub mod models;
pub mod routes;

pub use error::AppError;

/// Shared state for request handlers. Reads go to the repository only.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn CheckRepository>,
    pub targets: TargetRegistry,
    pub display_offset: FixedOffset,
}

async fn fallback_handler(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {uri}"))
}

pub fn create_axum_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    routes::create_status_router()
        .fallback(fallback_handler)
        .layer(cors)
        .with_state(Arc::new(app_state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::CheckStatus;
    use crate::db::services::CheckRecord;
    use crate::monitor::targets::Target;
    use crate::test_support::FakeRepository;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use tower::ServiceExt;

    fn registry() -> TargetRegistry {
        TargetRegistry::new([
            Target::new("busqueda", "http://busqueda:5000/health"),
            Target::new("inventario", "http://inventario:5001/health"),
            Target::new("ordenes", "http://ordenes:5002/health"),
        ])
    }

    fn record(service: &str, status: CheckStatus, secs: i64, http_status: Option<i32>) -> CheckRecord {
        CheckRecord {
            service: service.to_string(),
            status,
            response_time_ms: Some(secs as f64 * 10.0),
            http_status,
            checked_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        }
    }

    fn router_with(repo: FakeRepository) -> Router {
        create_axum_router(AppState {
            repository: Arc::new(repo),
            targets: registry(),
            display_offset: FixedOffset::west_opt(5 * 3600).unwrap(),
        })
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_is_constant() {
        let repo = FakeRepository::default();
        repo.fail_reads();

        let (status, body) = get_json(router_with(repo), "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({ "status": "OK", "service": "monitor" }));
    }

    #[tokio::test]
    async fn test_status_returns_latest_per_recorded_target() {
        let repo = FakeRepository::with_records([
            record("ordenes", CheckStatus::Healthy, 1, Some(200)),
            record("busqueda", CheckStatus::Degraded, 2, Some(200)),
            record("ordenes", CheckStatus::Down, 3, None),
            record("retired", CheckStatus::Healthy, 4, Some(200)),
        ]);

        let (status, body) = get_json(router_with(repo), "/status").await;

        assert_eq!(status, StatusCode::OK);
        let services = body["services"].as_array().unwrap();
        assert_eq!(services.len(), 2);

        assert_eq!(services[0]["service"], "busqueda");
        assert_eq!(services[0]["status"], "DEGRADED");
        assert_eq!(services[0]["http_status"], 200);

        assert_eq!(services[1]["service"], "ordenes");
        assert_eq!(services[1]["status"], "DOWN");
        assert_eq!(services[1]["http_status"], Value::Null);
        assert_eq!(services[1]["response_time_ms"], 30.0);
        assert_eq!(services[1]["checked_at"], "2023-11-14T22:13:23+00:00");
    }

    #[tokio::test]
    async fn test_status_timestamp_uses_display_offset() {
        let (status, body) = get_json(router_with(FakeRepository::default()), "/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["services"], serde_json::json!([]));
        let timestamp = body["timestamp"].as_str().unwrap();
        assert!(timestamp.ends_with(" -05:00"), "unexpected timestamp {timestamp}");
        assert_eq!(timestamp.len(), "2024-01-01 00:00:00 -05:00".len());
    }

    #[tokio::test]
    async fn test_status_storage_failure_is_server_error() {
        let repo = FakeRepository::default();
        repo.fail_reads();

        let (status, body) = get_json(router_with(repo), "/status").await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("connection refused"), "unexpected error {message}");
        assert!(body.get("services").is_none());
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let (status, body) = get_json(router_with(FakeRepository::default()), "/metrics").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("/metrics"));
    }
}
