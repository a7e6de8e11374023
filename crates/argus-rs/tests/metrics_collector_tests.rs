//! Integration tests for the metrics collector.
//!
//! Covers the HTTP counter invariants, the rolling latency mean, WebSocket
//! counters, system gauges, reset semantics, and randomized operation
//! sequences.

use argus_rs::services::metrics::{MetricsCollector, MetricsConfig};
use rand::Rng;
use std::collections::HashMap;
use std::time::Duration;

#[test]
fn test_http_counters_match_buckets() {
    let collector = MetricsCollector::default();

    collector.record_http_request("GET", "/a", 200, Duration::from_millis(10));
    collector.record_http_request("GET", "/b", 200, Duration::from_millis(20));
    collector.record_http_request("GET", "/c", 404, Duration::from_millis(5));
    collector.record_http_request("POST", "/d", 200, Duration::from_millis(30));
    collector.record_http_request("POST", "/e", 500, Duration::from_millis(40));

    let stats = collector.get_http_stats();
    assert_eq!(stats.total_requests, 5);
    assert_eq!(stats.requests_by_status[&200], 3);
    assert_eq!(stats.requests_by_status[&404], 1);
    assert_eq!(stats.requests_by_status[&500], 1);
    assert_eq!(stats.requests_by_method["GET"], 3);
    assert_eq!(stats.requests_by_method["POST"], 2);

    // The rolling mean stays inside the observed sample range.
    assert!(stats.average_latency_ms >= 5.0);
    assert!(stats.average_latency_ms <= 40.0);

    // total == sum over status buckets == sum over method buckets
    let by_status: u64 = stats.requests_by_status.values().sum();
    let by_method: u64 = stats.requests_by_method.values().sum();
    assert_eq!(stats.total_requests, by_status);
    assert_eq!(stats.total_requests, by_method);
}

#[test]
fn test_average_latency_seeded_then_smoothed() {
    let collector = MetricsCollector::default();

    collector.record_http_request("GET", "/", 200, Duration::from_millis(100));
    assert_eq!(collector.get_http_stats().average_latency_ms, 100.0);

    collector.record_http_request("GET", "/", 200, Duration::from_millis(200));
    // (100 * 99 + 200) / 100 = 101
    let average = collector.get_http_stats().average_latency_ms;
    assert!((average - 101.0).abs() < 1e-9);
}

#[test]
fn test_websocket_connection_gauge_can_go_negative() {
    let collector = MetricsCollector::default();

    collector.record_websocket_connection(false);
    collector.record_websocket_connection(false);
    assert_eq!(collector.get_websocket_stats().active_connections, -2);

    collector.record_websocket_connection(true);
    assert_eq!(collector.get_websocket_stats().active_connections, -1);
}

#[test]
fn test_websocket_messages_bucketed_by_direction_and_type() {
    let collector = MetricsCollector::default();

    collector.record_websocket_message("inbound", "text", 128);
    collector.record_websocket_message("inbound", "text", 64);
    collector.record_websocket_message("outbound", "binary", 1024);

    let stats = collector.get_websocket_stats();
    assert_eq!(stats.total_messages, 3);
    assert_eq!(stats.total_bytes, 1216);
    assert_eq!(stats.messages_by_type["inbound_text"], 2);
    assert_eq!(stats.messages_by_type["outbound_binary"], 1);
}

#[test]
fn test_system_gauges_overwrite() {
    let collector = MetricsCollector::default();

    collector.record_worker_tasks(8);
    collector.record_memory_usage(64 * 1024 * 1024);
    collector.record_worker_tasks(12);

    let stats = collector.get_system_stats();
    assert_eq!(stats.worker_tasks, 12);
    assert_eq!(stats.memory_usage_bytes, 64 * 1024 * 1024);
}

#[test]
fn test_business_metrics_reach_snapshot() {
    let collector = MetricsCollector::default();

    let mut tags = HashMap::new();
    tags.insert("region".to_string(), "eu".to_string());

    collector.record_business_metric("orders_placed", 7.0, &tags);
    collector.record_business_metric("queue_depth", 3.5, &HashMap::new());

    let snapshot = collector.get_stats();
    assert_eq!(snapshot.business_metrics["orders_placed{region=eu}"].value, 7.0);
    assert_eq!(snapshot.business_metrics["queue_depth"].value, 3.5);
    assert_eq!(snapshot.cardinality.current_size, 2);
}

#[test]
fn test_reset_restores_initial_state() {
    let collector = MetricsCollector::default();

    collector.record_http_request("GET", "/", 200, Duration::from_millis(10));
    collector.record_websocket_connection(true);
    collector.record_websocket_message("inbound", "text", 10);
    collector.record_business_metric("orders", 1.0, &HashMap::new());
    collector.record_worker_tasks(4);

    collector.reset();

    let snapshot = collector.get_stats();
    assert_eq!(snapshot.http.total_requests, 0);
    assert!(snapshot.http.requests_by_status.is_empty());
    assert_eq!(snapshot.http.average_latency_ms, 0.0);
    assert_eq!(snapshot.websocket.active_connections, 0);
    assert_eq!(snapshot.websocket.total_messages, 0);
    assert_eq!(snapshot.system.worker_tasks, 0);
    assert!(snapshot.business_metrics.is_empty());
    assert_eq!(snapshot.cardinality.eviction_stats.total_evictions, 0);
}

#[test]
fn test_snapshot_is_a_copy() {
    let collector = MetricsCollector::default();
    collector.record_http_request("GET", "/", 200, Duration::from_millis(10));

    let before = collector.get_stats();
    collector.record_http_request("GET", "/", 200, Duration::from_millis(10));

    // Mutations after the snapshot do not bleed into it.
    assert_eq!(before.http.total_requests, 1);
    assert_eq!(collector.get_stats().http.total_requests, 2);
}

#[test]
fn test_randomized_sequences_preserve_counter_invariants() {
    let mut rng = rand::thread_rng();
    let collector = MetricsCollector::new(MetricsConfig {
        max_cardinality: 32,
        shard_count: 4,
    });

    let methods = ["GET", "POST", "PUT", "DELETE"];
    let statuses = [200u16, 201, 400, 404, 500];

    for step in 0..2_000 {
        match rng.gen_range(0..10) {
            0..=4 => {
                let method = methods[rng.gen_range(0..methods.len())];
                let status = statuses[rng.gen_range(0..statuses.len())];
                let duration = Duration::from_millis(rng.gen_range(1..250));
                collector.record_http_request(method, "/load", status, duration);
            }
            5..=7 => {
                let name = format!("metric_{}", rng.gen_range(0..100));
                collector.record_business_metric(name.as_str(), rng.gen::<f64>(), &HashMap::new());
            }
            8 => {
                let snapshot = collector.get_stats();
                let by_status: u64 = snapshot.http.requests_by_status.values().sum();
                let by_method: u64 = snapshot.http.requests_by_method.values().sum();
                assert_eq!(snapshot.http.total_requests, by_status);
                assert_eq!(snapshot.http.total_requests, by_method);
                assert!(snapshot.cardinality.current_size <= snapshot.cardinality.max_cardinality);
            }
            _ => {
                if step % 7 == 0 {
                    collector.reset();
                }
            }
        }
    }

    let snapshot = collector.get_stats();
    let by_status: u64 = snapshot.http.requests_by_status.values().sum();
    assert_eq!(snapshot.http.total_requests, by_status);
    assert!(snapshot.cardinality.current_size <= snapshot.cardinality.max_cardinality);
}
