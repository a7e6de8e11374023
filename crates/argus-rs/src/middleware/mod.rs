//! Request-path middleware for the argus-rs observability core.
//!
//! Both middleware are passive: they observe requests and record into the
//! core, but never reject, rewrite, or delay a request. They integrate into
//! Actix Web's middleware pipeline:
//!
//! ```text
//! Client Request → RequestTracing → RequestMetrics → Handler
//!       ↓               ↓                ↓              ↓
//!    Headers        span start      size capture     Business
//!    Body           context attach  start instant    Logic
//!    Response       span finish     status+latency   Response
//! ```
//!
//! # Module Organization
//!
//! - [`metrics`] - Records status, duration, and payload sizes per request
//! - [`tracing`] - Starts a span per request, attaches it to the request
//!   extensions, and finishes it when the handler returns — on error paths too

pub mod metrics;
pub mod tracing;
