//! Thread-safe metrics collection for HTTP, WebSocket, system, and business
//! metric families.
//!
//! The [`MetricsCollector`] is constructed once at application startup and
//! shared (it is `Clone`; all state lives behind `Arc`s) with the middleware,
//! the WebSocket hub, and the operator endpoints. Every record operation is
//! total: it never returns an error, never blocks for long, and never
//! suspends — the hot paths are an atomic add plus a short mutex-guarded map
//! update.

use crate::services::business_metrics::{
    canonical_key, BusinessMetricEntry, BusinessMetricStore, CardinalityInfo, EvictionStats,
    DEFAULT_MAX_CARDINALITY, DEFAULT_SHARD_COUNT,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Nominal window for the rolling latency mean: each new sample carries a
/// 1/100 weight against the accumulated average.
const LATENCY_WINDOW: f64 = 100.0;

/// Sizing configuration for the business-metric store.
///
/// A zero value for either field selects the default (10 000 keys across 16
/// shards).
#[derive(Debug, Clone, Copy)]
pub struct MetricsConfig {
    /// Upper bound on distinct business-metric keys
    pub max_cardinality: usize,
    /// Number of shards striping the business-metric store
    pub shard_count: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            max_cardinality: DEFAULT_MAX_CARDINALITY,
            shard_count: DEFAULT_SHARD_COUNT,
        }
    }
}

/// Snapshot of the HTTP request family.
#[derive(Debug, Clone, Serialize)]
pub struct HttpStats {
    /// Total requests recorded
    pub total_requests: u64,
    /// Requests bucketed by response status code
    pub requests_by_status: HashMap<u16, u64>,
    /// Requests bucketed by method
    pub requests_by_method: HashMap<String, u64>,
    /// Rolling mean latency in milliseconds (nominal 100-sample window)
    pub average_latency_ms: f64,
    /// When the family was last mutated
    pub last_updated: DateTime<Utc>,
}

/// Snapshot of the WebSocket family.
#[derive(Debug, Clone, Serialize)]
pub struct WebSocketStats {
    /// Currently registered connections. Transiently negative values are
    /// possible during unbalanced register/deregister and are not clamped.
    pub active_connections: i64,
    /// Total messages recorded in either direction
    pub total_messages: u64,
    /// Total payload bytes recorded in either direction
    pub total_bytes: u64,
    /// Messages bucketed by `{direction}_{type}`
    pub messages_by_type: HashMap<String, u64>,
    /// When the family was last mutated
    pub last_updated: DateTime<Utc>,
}

/// Snapshot of the system gauges.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    /// Worker task count reported by the runtime sampler
    pub worker_tasks: usize,
    /// Resident memory in bytes
    pub memory_usage_bytes: u64,
    /// When the gauges were last overwritten
    pub last_updated: DateTime<Utc>,
}

/// Full collector snapshot returned by [`MetricsCollector::get_stats`].
///
/// The snapshot is eventually consistent: each family (and each business
/// shard) is copied under its own lock, so families may be captured at
/// slightly different instants.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub http: HttpStats,
    pub websocket: WebSocketStats,
    pub system: SystemStats,
    pub business_metrics: HashMap<String, BusinessMetricEntry>,
    pub cardinality: CardinalityInfo,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug)]
struct HttpState {
    requests_by_status: HashMap<u16, u64>,
    requests_by_method: HashMap<String, u64>,
    average_latency_ms: f64,
    last_updated: DateTime<Utc>,
}

impl HttpState {
    fn new() -> Self {
        Self {
            requests_by_status: HashMap::new(),
            requests_by_method: HashMap::new(),
            average_latency_ms: 0.0,
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug)]
struct WebSocketState {
    total_messages: u64,
    total_bytes: u64,
    messages_by_type: HashMap<String, u64>,
    last_updated: DateTime<Utc>,
}

impl WebSocketState {
    fn new() -> Self {
        Self {
            total_messages: 0,
            total_bytes: 0,
            messages_by_type: HashMap::new(),
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug)]
struct SystemState {
    worker_tasks: usize,
    memory_usage_bytes: u64,
    last_updated: DateTime<Utc>,
}

impl SystemState {
    fn new() -> Self {
        Self {
            worker_tasks: 0,
            memory_usage_bytes: 0,
            last_updated: Utc::now(),
        }
    }
}

/// Thread-safe collector for the four metric families.
///
/// # Thread Safety
///
/// The monotonic request counter and the active-connection gauge use atomic
/// adds as the fast path. Each family behind them uses its own read-write
/// lock, and business metrics are striped across independent shards, so
/// writers on different families (or different shards) never contend.
///
/// # Usage
///
/// The collector is typically created once and shared via Actix Web's
/// application data:
///
/// ```rust
/// use actix_web::{web, App};
/// use argus_rs::services::metrics::MetricsCollector;
///
/// let metrics = MetricsCollector::default();
/// let app = App::new().app_data(web::Data::new(metrics.clone()));
/// ```
#[derive(Clone)]
pub struct MetricsCollector {
    total_requests: Arc<AtomicU64>,
    active_connections: Arc<AtomicI64>,
    http: Arc<RwLock<HttpState>>,
    websocket: Arc<RwLock<WebSocketState>>,
    system: Arc<RwLock<SystemState>>,
    business: Arc<BusinessMetricStore>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

impl MetricsCollector {
    /// Creates a collector with the given business-metric sizing.
    pub fn new(config: MetricsConfig) -> Self {
        Self {
            total_requests: Arc::new(AtomicU64::new(0)),
            active_connections: Arc::new(AtomicI64::new(0)),
            http: Arc::new(RwLock::new(HttpState::new())),
            websocket: Arc::new(RwLock::new(WebSocketState::new())),
            system: Arc::new(RwLock::new(SystemState::new())),
            business: Arc::new(BusinessMetricStore::new(
                config.max_cardinality,
                config.shard_count,
            )),
        }
    }

    /// Records a completed HTTP request.
    ///
    /// Increments the monotonic request counter atomically, then bumps the
    /// by-status and by-method buckets and folds `duration` into the rolling
    /// latency mean (`avg' = (avg·99 + sample) / 100`, seeded with the first
    /// sample).
    ///
    /// `path` is accepted for call-site symmetry but deliberately not
    /// retained: per-path buckets would grow without bound on crafted URLs.
    pub fn record_http_request(
        &self,
        method: &str,
        _path: &str,
        status_code: u16,
        duration: Duration,
    ) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let sample_ms = duration.as_secs_f64() * 1000.0;
        let mut http = self.http.write().unwrap();
        *http.requests_by_status.entry(status_code).or_insert(0) += 1;
        *http
            .requests_by_method
            .entry(method.to_string())
            .or_insert(0) += 1;
        if http.average_latency_ms == 0.0 {
            http.average_latency_ms = sample_ms;
        } else {
            http.average_latency_ms =
                (http.average_latency_ms * (LATENCY_WINDOW - 1.0) + sample_ms) / LATENCY_WINDOW;
        }
        http.last_updated = Utc::now();
    }

    /// Accepted for API symmetry; the bounded collector does not track
    /// request sizes.
    pub fn record_http_request_size(&self, _bytes: u64) {}

    /// Accepted for API symmetry; the bounded collector does not track
    /// response sizes.
    pub fn record_http_response_size(&self, _bytes: u64) {}

    /// Registers (`true`) or deregisters (`false`) a WebSocket connection.
    ///
    /// The gauge is a signed atomic: unbalanced deregisters produce transient
    /// negative readings rather than wrapping.
    pub fn record_websocket_connection(&self, connected: bool) {
        if connected {
            self.active_connections.fetch_add(1, Ordering::Relaxed);
        } else {
            self.active_connections.fetch_sub(1, Ordering::Relaxed);
        }
        self.websocket.write().unwrap().last_updated = Utc::now();
    }

    /// Records a WebSocket message of `size` bytes flowing in `direction`
    /// (`"inbound"` / `"outbound"`) with the given frame type.
    pub fn record_websocket_message(&self, direction: &str, message_type: &str, size: usize) {
        let mut ws = self.websocket.write().unwrap();
        ws.total_messages += 1;
        ws.total_bytes += size as u64;
        *ws.messages_by_type
            .entry(format!("{}_{}", direction, message_type))
            .or_insert(0) += 1;
        ws.last_updated = Utc::now();
    }

    /// Records a labelled business metric.
    ///
    /// The stored key is `name` when `tags` is empty, otherwise
    /// `name{key=value}` keeping a single tag dimension (see
    /// [`canonical_key`]). Recording an existing key overwrites its value and
    /// promotes it to most-recently-used; recording a new key may evict the
    /// least-recently-used key of its shard.
    pub fn record_business_metric(
        &self,
        name: &str,
        value: f64,
        tags: &HashMap<String, String>,
    ) {
        self.business.record(canonical_key(name, tags), value);
    }

    /// Overwrites the worker-task gauge.
    pub fn record_worker_tasks(&self, count: usize) {
        let mut system = self.system.write().unwrap();
        system.worker_tasks = count;
        system.last_updated = Utc::now();
    }

    /// Overwrites the resident-memory gauge.
    pub fn record_memory_usage(&self, bytes: u64) {
        let mut system = self.system.write().unwrap();
        system.memory_usage_bytes = bytes;
        system.last_updated = Utc::now();
    }

    /// Returns an RAII guard that counts one WebSocket connection for its
    /// lifetime. The connection is deregistered on [`ConnectionGuard::close`]
    /// or, failing that, on drop.
    pub fn track_connection(&self) -> ConnectionGuard {
        self.record_websocket_connection(true);
        ConnectionGuard {
            collector: self.clone(),
            closed: AtomicBool::new(false),
        }
    }

    /// Copies the HTTP family.
    pub fn get_http_stats(&self) -> HttpStats {
        let http = self.http.read().unwrap();
        HttpStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            requests_by_status: http.requests_by_status.clone(),
            requests_by_method: http.requests_by_method.clone(),
            average_latency_ms: http.average_latency_ms,
            last_updated: http.last_updated,
        }
    }

    /// Copies the WebSocket family.
    pub fn get_websocket_stats(&self) -> WebSocketStats {
        let ws = self.websocket.read().unwrap();
        WebSocketStats {
            active_connections: self.active_connections.load(Ordering::Relaxed),
            total_messages: ws.total_messages,
            total_bytes: ws.total_bytes,
            messages_by_type: ws.messages_by_type.clone(),
            last_updated: ws.last_updated,
        }
    }

    /// Copies the system gauges.
    pub fn get_system_stats(&self) -> SystemStats {
        let system = self.system.read().unwrap();
        SystemStats {
            worker_tasks: system.worker_tasks,
            memory_usage_bytes: system.memory_usage_bytes,
            last_updated: system.last_updated,
        }
    }

    /// Copies the eviction accounting of the business-metric store.
    pub fn get_eviction_stats(&self) -> EvictionStats {
        self.business.eviction_stats()
    }

    /// Copies the cardinality view of the business-metric store.
    pub fn get_cardinality_info(&self) -> CardinalityInfo {
        self.business.cardinality_info()
    }

    /// Assembles the full snapshot for the operator endpoint.
    ///
    /// Families are copied one lock at a time, so the result is eventually
    /// consistent rather than a global point-in-time; in particular the
    /// atomic request counter may momentarily run ahead of the by-status and
    /// by-method buckets.
    pub fn get_stats(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            http: self.get_http_stats(),
            websocket: self.get_websocket_stats(),
            system: self.get_system_stats(),
            business_metrics: self.business.snapshot(),
            cardinality: self.business.cardinality_info(),
            timestamp: Utc::now(),
        }
    }

    /// Returns the collector to its initial state. Testing affordance; not
    /// intended for production use.
    pub fn reset(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.active_connections.store(0, Ordering::Relaxed);
        *self.http.write().unwrap() = HttpState::new();
        *self.websocket.write().unwrap() = WebSocketState::new();
        *self.system.write().unwrap() = SystemState::new();
        self.business.clear();
    }
}

/// RAII registration of one WebSocket connection.
///
/// Mirrors the connection lifetime: created when the socket is accepted,
/// closed (explicitly or by drop) when the pumps wind down. Deregistration
/// happens exactly once however the guard is disposed of.
pub struct ConnectionGuard {
    collector: MetricsCollector,
    closed: AtomicBool,
}

impl ConnectionGuard {
    /// Deregisters the connection now instead of waiting for drop.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::Relaxed) {
            self.collector.record_websocket_connection(false);
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_seeds_with_first_sample() {
        let collector = MetricsCollector::default();
        collector.record_http_request("GET", "/a", 200, Duration::from_millis(40));
        assert_eq!(collector.get_http_stats().average_latency_ms, 40.0);
    }

    #[test]
    fn test_connection_guard_is_idempotent() {
        let collector = MetricsCollector::default();
        let guard = collector.track_connection();
        assert_eq!(collector.get_websocket_stats().active_connections, 1);

        guard.close();
        guard.close();
        drop(guard);
        assert_eq!(collector.get_websocket_stats().active_connections, 0);
    }

    #[test]
    fn test_size_recorders_are_noops() {
        let collector = MetricsCollector::default();
        collector.record_http_request_size(4096);
        collector.record_http_response_size(8192);
        assert_eq!(collector.get_http_stats().total_requests, 0);
    }
}
