//! Service layer for the argus-rs observability core.
//!
//! This module contains the three cooperating components and their support
//! machinery. All of them are constructed explicitly at process start and
//! shared by cloning (state lives behind `Arc`s); nothing here is a
//! package-scope singleton.
//!
//! # Module Organization
//!
//! - [`metrics`] - The metrics collector: HTTP, WebSocket, system, and
//!   business families with snapshot reads
//! - [`business_metrics`] - Sharded, bounded LRU storage backing the
//!   business family
//! - [`health`] - The health supervisor: probe registry, periodic parallel
//!   fan-out, cached results, aggregate status
//! - [`tracer`] - Span creation, context propagation, event logging, and the
//!   exporter seam
//! - [`system_monitor`] - Background sampler feeding the system gauges
//!
//! # Concurrency
//!
//! Record operations never suspend: the hot paths are an atomic add plus a
//! short mutex-held map update, and business metrics stripe across
//! independent shards. The only suspension point in the core is the health
//! supervisor's fan-out join, where it waits for every probe task to return
//! or time out.

pub mod business_metrics;
pub mod health;
pub mod metrics;
pub mod system_monitor;
pub mod tracer;
