//! Data models and domain types for the argus-rs observability core.
//!
//! This module contains the shared vocabulary used across the collector,
//! supervisor, and tracer: severity grades, health statuses, and the
//! result types cached by health probes. All types here are plain data:
//! they carry no locking and are cheap to clone into snapshots.
//!
//! # Module Organization
//!
//! - [`severity`] - Ordered severity levels for span status and event logging
//! - [`health`] - Health statuses, aggregation rules, and probe results

pub mod health;
pub mod severity;
