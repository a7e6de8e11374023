//! Metrics endpoints: JSON snapshot and Prometheus exposition.
//!
//! The JSON endpoint is the primary operator surface and always answers
//! `200` with whatever data the collector has. The Prometheus endpoint
//! renders the same snapshot in exposition format for scrape-based
//! monitoring infrastructure.

use actix_web::{web, HttpResponse, Result};
use std::fmt::Write as _;

use crate::services::metrics::{MetricsCollector, MetricsSnapshot};

/// JSON snapshot endpoint.
///
/// Returns the full [`MetricsSnapshot`]: HTTP, WebSocket, and system
/// families, the business-metric map, and cardinality/eviction accounting.
/// Always `200`; the snapshot is eventually consistent by contract.
pub async fn metrics_snapshot(collector: web::Data<MetricsCollector>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(collector.get_stats()))
}

fn render_prometheus(snapshot: &MetricsSnapshot) -> String {
    let mut out = String::with_capacity(2048);

    out.push_str("# HELP argus_http_requests_total Total number of HTTP requests\n");
    out.push_str("# TYPE argus_http_requests_total counter\n");
    let _ = writeln!(out, "argus_http_requests_total {}", snapshot.http.total_requests);

    out.push_str("\n# HELP argus_http_requests_by_status HTTP requests by response status\n");
    out.push_str("# TYPE argus_http_requests_by_status counter\n");
    for (status, count) in &snapshot.http.requests_by_status {
        let _ = writeln!(
            out,
            "argus_http_requests_by_status{{status=\"{}\"}} {}",
            status, count
        );
    }

    out.push_str("\n# HELP argus_http_requests_by_method HTTP requests by method\n");
    out.push_str("# TYPE argus_http_requests_by_method counter\n");
    for (method, count) in &snapshot.http.requests_by_method {
        let _ = writeln!(
            out,
            "argus_http_requests_by_method{{method=\"{}\"}} {}",
            method, count
        );
    }

    out.push_str("\n# HELP argus_http_average_latency_ms Rolling mean request latency\n");
    out.push_str("# TYPE argus_http_average_latency_ms gauge\n");
    let _ = writeln!(
        out,
        "argus_http_average_latency_ms {:.3}",
        snapshot.http.average_latency_ms
    );

    out.push_str("\n# HELP argus_websocket_active_connections Currently registered WebSocket connections\n");
    out.push_str("# TYPE argus_websocket_active_connections gauge\n");
    let _ = writeln!(
        out,
        "argus_websocket_active_connections {}",
        snapshot.websocket.active_connections
    );

    out.push_str("\n# HELP argus_websocket_messages_total Total WebSocket messages\n");
    out.push_str("# TYPE argus_websocket_messages_total counter\n");
    let _ = writeln!(
        out,
        "argus_websocket_messages_total {}",
        snapshot.websocket.total_messages
    );

    out.push_str("\n# HELP argus_websocket_messages_by_type WebSocket messages by direction and frame type\n");
    out.push_str("# TYPE argus_websocket_messages_by_type counter\n");
    for (kind, count) in &snapshot.websocket.messages_by_type {
        let _ = writeln!(
            out,
            "argus_websocket_messages_by_type{{type=\"{}\"}} {}",
            kind, count
        );
    }

    out.push_str("\n# HELP argus_system_worker_tasks Runtime worker task count\n");
    out.push_str("# TYPE argus_system_worker_tasks gauge\n");
    let _ = writeln!(out, "argus_system_worker_tasks {}", snapshot.system.worker_tasks);

    out.push_str("\n# HELP argus_system_memory_usage_bytes Resident memory in bytes\n");
    out.push_str("# TYPE argus_system_memory_usage_bytes gauge\n");
    let _ = writeln!(
        out,
        "argus_system_memory_usage_bytes {}",
        snapshot.system.memory_usage_bytes
    );

    out.push_str("\n# HELP argus_business_metric Labelled business metric values\n");
    out.push_str("# TYPE argus_business_metric gauge\n");
    for (key, entry) in &snapshot.business_metrics {
        let _ = writeln!(
            out,
            "argus_business_metric{{key=\"{}\"}} {}",
            key.replace('"', "\\\""),
            entry.value
        );
    }

    out.push_str("\n# HELP argus_business_cardinality_current Distinct business-metric keys stored\n");
    out.push_str("# TYPE argus_business_cardinality_current gauge\n");
    let _ = writeln!(
        out,
        "argus_business_cardinality_current {}",
        snapshot.cardinality.current_size
    );

    out.push_str("\n# HELP argus_business_evictions_total Business-metric keys evicted by the cardinality bound\n");
    out.push_str("# TYPE argus_business_evictions_total counter\n");
    let _ = writeln!(
        out,
        "argus_business_evictions_total {}",
        snapshot.cardinality.eviction_stats.total_evictions
    );

    out
}

/// Prometheus exposition endpoint.
///
/// Renders the snapshot as `argus_*` metric families in the text exposition
/// format, suitable for Prometheus scraping and Grafana dashboards.
pub async fn metrics_prometheus(collector: web::Data<MetricsCollector>) -> Result<HttpResponse> {
    let snapshot = collector.get_stats();
    Ok(HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4; charset=utf-8")
        .body(render_prometheus(&snapshot)))
}

/// Registers the metrics routes.
///
/// # Registered Routes
///
/// - `GET /metrics` - Full snapshot as JSON (always 200)
/// - `GET /metrics/prometheus` - Prometheus exposition format
///
/// Requires a shared [`MetricsCollector`] in application data.
pub fn configure_metrics(cfg: &mut web::ServiceConfig) {
    cfg.route("/metrics", web::get().to(metrics_snapshot))
        .route("/metrics/prometheus", web::get().to(metrics_prometheus));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_prometheus_rendering_contains_families() {
        let collector = MetricsCollector::default();
        collector.record_http_request("GET", "/x", 200, Duration::from_millis(5));
        collector.record_business_metric("orders", 3.0, &HashMap::new());

        let text = render_prometheus(&collector.get_stats());
        assert!(text.contains("argus_http_requests_total 1"));
        assert!(text.contains("argus_http_requests_by_status{status=\"200\"} 1"));
        assert!(text.contains("argus_business_metric{key=\"orders\"} 3"));
        assert!(text.contains("argus_business_cardinality_current 1"));
    }
}
