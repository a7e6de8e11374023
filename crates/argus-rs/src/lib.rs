//! # Argus-rs Observability Core
//!
//! A high-throughput observability core for actix-web services, built around
//! three cooperating components: a bounded-cardinality metrics collector, a
//! periodic health-check supervisor, and a hierarchical span tracer. All
//! three are constructed explicitly at process start and passed to the
//! middleware and operator endpoints — there are no hidden global
//! collectors.
//!
//! ## Quick Start
//!
//! ```rust
//! use argus_rs::services::health::{HealthSupervisor, HealthSupervisorConfig};
//! use argus_rs::services::metrics::MetricsCollector;
//! use argus_rs::services::tracer::Tracer;
//! use std::collections::HashMap;
//! use std::time::Duration;
//!
//! // Construct the core once at startup
//! let metrics = MetricsCollector::default();
//! let supervisor = HealthSupervisor::new(HealthSupervisorConfig::default());
//! let tracer = Tracer::default();
//!
//! // Record inline on the request path
//! metrics.record_http_request("GET", "/users/42", 200, Duration::from_millis(12));
//! metrics.record_business_metric("orders_placed", 1.0, &HashMap::new());
//!
//! let snapshot = metrics.get_stats();
//! assert_eq!(snapshot.http.total_requests, 1);
//! ```
//!
//! ## Core Components
//!
//! ### Metrics Collection
//! - **HTTP family**: request counts by status and method, rolling mean latency
//! - **WebSocket family**: active connections, message counts by direction and type
//! - **System family**: worker task count and resident memory gauges
//! - **Business family**: labelled float metrics behind a sharded, bounded LRU
//!   that survives unbounded tag explosions without memory growth
//!
//! ### Health Supervision
//! - Dynamic registry of named async probes
//! - Periodic parallel fan-out with per-probe timeouts and panic containment
//! - Cached results and a three-grade aggregate status
//!
//! ### Span Tracing
//! - Trace/parent/span identifiers threaded through a request-scoped context
//! - Severity-graded events in insertion order, finish-once export semantics
//! - Pluggable exporter seam with no-op and log-bridge implementations
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────┐   ┌────────────────────────┐   ┌──────────────────┐
//! │   Client    │──▶│   actix-web service    │──▶│    Handlers      │
//! └─────────────┘   │                        │   └──────────────────┘
//!                   │  ┌─────────────────────┤
//!                   │  │ RequestTracing      ││  spans + context
//!                   │  ├─────────────────────┤│
//!                   │  │ RequestMetrics      ││  counters + latency
//!                   │  └─────────────────────┘│
//!                   └───────────┬────────────┘
//!                               ▼
//!                ┌──────────────────────────────┐
//!                │  /health  /metrics  /observability  │
//!                └──────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - **[`models`]** - Severity levels, health statuses, and probe result types
//! - **[`services`]** - The collector, supervisor, tracer, and system sampler
//! - **[`middleware`]** - Request-path metrics and tracing middleware
//! - **[`routes`]** - Operator endpoints (health, metrics, combined snapshot)
//! - **[`logs`]** - Logging configuration and structured output
//!
//! ## Concurrency Model
//!
//! Recording operations never suspend: they take short mutexes or use atomic
//! adds. Business metrics are striped across independent shards selected by a
//! stable hash of the canonical key, so uncontended writers never serialise
//! against each other. Snapshot reads lock shards one at a time and are
//! eventually consistent by contract.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: log level filtering
//! - `NO_COLOR`: disable colored log output

pub mod logs;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
