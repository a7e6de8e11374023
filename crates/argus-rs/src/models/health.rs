//! Health statuses, aggregation rules, and probe result types.
//!
//! A probe reports a [`HealthCheckResult`] with one of three statuses. The
//! supervisor caches the most recent result per probe and folds them into an
//! aggregate with [`HealthStatus::aggregate`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Coarse health grade reported by a probe.
///
/// # Examples
///
/// ```rust
/// use argus_rs::models::health::HealthStatus;
///
/// let statuses = [HealthStatus::Healthy, HealthStatus::Degraded];
/// assert_eq!(HealthStatus::aggregate(statuses.iter()), HealthStatus::Degraded);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The subsystem is fully operational
    Healthy,
    /// The subsystem works but with reduced capacity or elevated risk
    Degraded,
    /// The subsystem is not operational
    Unhealthy,
}

impl HealthStatus {
    /// Folds a set of statuses into the aggregate grade.
    ///
    /// Any unhealthy member makes the aggregate unhealthy; otherwise any
    /// degraded member makes it degraded; an empty set is healthy.
    pub fn aggregate<'a, I>(statuses: I) -> HealthStatus
    where
        I: IntoIterator<Item = &'a HealthStatus>,
    {
        let mut aggregate = HealthStatus::Healthy;
        for status in statuses {
            match status {
                HealthStatus::Unhealthy => return HealthStatus::Unhealthy,
                HealthStatus::Degraded => aggregate = HealthStatus::Degraded,
                HealthStatus::Healthy => {}
            }
        }
        aggregate
    }

    /// Lowercase wire name for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Unhealthy => "unhealthy",
        }
    }
}

/// Most recent outcome of a single named probe.
///
/// `last_checked` and `duration` are filled in by the supervisor on
/// completion; probe implementations only need to supply status, message,
/// and any diagnostic details.
///
/// # Examples
///
/// ```rust
/// use argus_rs::models::health::HealthCheckResult;
///
/// let result = HealthCheckResult::unhealthy("connection refused")
///     .with_detail("endpoint", "db-primary:5432");
/// assert_eq!(result.message, "connection refused");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Grade reported by the probe
    pub status: HealthStatus,
    /// Human-readable summary of the outcome
    pub message: String,
    /// Probe-specific diagnostic values
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, serde_json::Value>,
    /// When the probe last completed
    pub last_checked: DateTime<Utc>,
    /// How long the probe took, in milliseconds on the wire
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl HealthCheckResult {
    fn with_status(status: HealthStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: HashMap::new(),
            last_checked: Utc::now(),
            duration: Duration::ZERO,
        }
    }

    /// Builds a healthy result with the given message.
    pub fn healthy(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Healthy, message)
    }

    /// Builds a degraded result with the given message.
    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Degraded, message)
    }

    /// Builds an unhealthy result with the given message.
    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Unhealthy, message)
    }

    /// Attaches a diagnostic detail, consuming and returning the result.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Serialization support for `Duration` as integer milliseconds.
pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
