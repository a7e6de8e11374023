//! Combined operator snapshot endpoint.
//!
//! Dashboards that want one request instead of three can read the metrics
//! snapshot, the cached health results, and the aggregate status as a single
//! JSON object.

use actix_web::{web, HttpResponse, Result};
use serde_json::json;

use crate::services::health::HealthSupervisor;
use crate::services::metrics::MetricsCollector;

/// Aggregated operator endpoint.
///
/// # Response Format
///
/// ```json
/// {
///   "metrics": { "http": { ... }, "websocket": { ... }, ... },
///   "health": { "status": "healthy", "checks": { ... } },
///   "timestamp": "2024-03-15T10:30:00Z"
/// }
/// ```
///
/// Always `200`: the endpoint reports whatever state the core currently has,
/// even when the aggregate health is unhealthy (use `/health` for a
/// status-coded answer).
pub async fn observability_snapshot(
    collector: web::Data<MetricsCollector>,
    supervisor: web::Data<HealthSupervisor>,
) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(json!({
        "metrics": collector.get_stats(),
        "health": {
            "status": supervisor.get_overall_status().as_str(),
            "checks": supervisor.get_results(),
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

/// Registers the combined snapshot route.
///
/// # Registered Routes
///
/// - `GET /observability` - Metrics, health, and timestamp in one object
///
/// Requires both the [`MetricsCollector`] and the [`HealthSupervisor`] in
/// application data.
pub fn configure_observability(cfg: &mut web::ServiceConfig) {
    cfg.route("/observability", web::get().to(observability_snapshot));
}
