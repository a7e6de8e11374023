//! Logging configuration for the argus-rs observability core.
//!
//! # Module Organization
//!
//! - [`logger`] - `env_logger` setup with aligned, colour-aware output

pub mod logger;
