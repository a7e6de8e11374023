//! Health endpoints backed by the health supervisor.

use actix_web::{web, HttpResponse, Result};
use serde_json::json;

use crate::models::health::HealthStatus;
use crate::services::health::HealthSupervisor;

/// Aggregate health endpoint.
///
/// Reads the supervisor's cached probe results (it does not run the probes
/// inline) and reports the aggregate plus every per-probe result.
///
/// # Response Format
///
/// ```json
/// {
///   "status": "degraded",
///   "checks": {
///     "database": { "status": "healthy", "message": "database reachable", ... }
///   },
///   "timestamp": "2024-03-15T10:30:00Z"
/// }
/// ```
///
/// # Returns
///
/// - `200 OK` when the aggregate is healthy or degraded
/// - `503 Service Unavailable` when any cached result is unhealthy
pub async fn health_check(supervisor: web::Data<HealthSupervisor>) -> Result<HttpResponse> {
    let status = supervisor.get_overall_status();
    let body = json!({
        "status": status.as_str(),
        "checks": supervisor.get_results(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    let response = match status {
        HealthStatus::Unhealthy => HttpResponse::ServiceUnavailable().json(body),
        _ => HttpResponse::Ok().json(body),
    };
    Ok(response)
}

/// Kubernetes readiness probe endpoint.
///
/// Answers `200` while the process accepts traffic; deeper dependency health
/// lives on `/health`.
pub async fn readiness_check() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "ready",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Kubernetes liveness probe endpoint.
///
/// Only fails when the process itself is broken; temporary downstream
/// unavailability must not trip it.
pub async fn liveness_check() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "status": "alive",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Registers the health routes.
///
/// # Registered Routes
///
/// - `GET /health` - Aggregate health with per-probe results (503 when unhealthy)
/// - `GET /ready` - Kubernetes readiness probe endpoint
/// - `GET /live` - Kubernetes liveness probe endpoint
///
/// Requires a shared [`HealthSupervisor`] in application data.
pub fn configure_health(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/ready", web::get().to(readiness_check))
        .route("/live", web::get().to(liveness_check));
}
