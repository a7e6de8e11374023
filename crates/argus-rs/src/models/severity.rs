//! Ordered severity levels for span status and event logging.
//!
//! Severities form a nine-step graded scale (plus the unset default) with
//! fixed numeric codes. Comparisons always go through the numeric code, so
//! adding a level never silently reorders existing ones.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Severity grade attached to span events and to a span's terminal status.
///
/// The numeric codes are part of the public contract (they are what external
/// exporters map from), so they are spelled out rather than derived from
/// declaration order.
///
/// # Examples
///
/// ```rust
/// use argus_rs::models::severity::Severity;
///
/// assert!(Severity::Error < Severity::Critical);
/// assert_eq!(Severity::Warn.code(), 40);
/// assert!(Severity::Alert.is_error());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// No severity assigned yet (new spans start here)
    Unset,
    /// Operation completed normally
    Ok,
    /// Diagnostic detail for development
    Debug,
    /// Routine operational information
    Info,
    /// Normal but noteworthy condition
    Notice,
    /// Something unexpected that did not fail the operation
    Warn,
    /// The operation failed
    #[serde(alias = "Error")]
    Error,
    /// Failure affecting a whole component
    Critical,
    /// Failure requiring immediate operator action
    Alert,
    /// The service is unusable
    Emergency,
}

impl Severity {
    /// Returns the numeric code for this level.
    pub fn code(&self) -> u8 {
        match self {
            Severity::Unset => 0,
            Severity::Ok => 1,
            Severity::Debug => 10,
            Severity::Info => 20,
            Severity::Notice => 30,
            Severity::Warn => 40,
            Severity::Error => 50,
            Severity::Critical => 60,
            Severity::Alert => 70,
            Severity::Emergency => 80,
        }
    }

    /// Looks up a level by its exact numeric code.
    ///
    /// Unknown codes fall back to [`Severity::Unset`].
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Severity::Ok,
            10 => Severity::Debug,
            20 => Severity::Info,
            30 => Severity::Notice,
            40 => Severity::Warn,
            50 => Severity::Error,
            60 => Severity::Critical,
            70 => Severity::Alert,
            80 => Severity::Emergency,
            _ => Severity::Unset,
        }
    }

    /// Canonical lowercase name, as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Unset => "unset",
            Severity::Ok => "ok",
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Notice => "notice",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Critical => "critical",
            Severity::Alert => "alert",
            Severity::Emergency => "emergency",
        }
    }

    /// True for [`Severity::Error`] and every level above it.
    pub fn is_error(&self) -> bool {
        self.code() >= Severity::Error.code()
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Unset
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.code().cmp(&other.code())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognised severity name.
#[derive(Debug, thiserror::Error)]
#[error("unknown severity level: {0}")]
pub struct ParseSeverityError(String);

impl FromStr for Severity {
    type Err = ParseSeverityError;

    /// Parses the canonical lowercase names. The capitalised `"Error"` spelling
    /// is accepted as a legacy alias and maps to the same level.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unset" => Ok(Severity::Unset),
            "ok" => Ok(Severity::Ok),
            "debug" => Ok(Severity::Debug),
            "info" => Ok(Severity::Info),
            "notice" => Ok(Severity::Notice),
            "warn" => Ok(Severity::Warn),
            "error" | "Error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            "alert" => Ok(Severity::Alert),
            "emergency" => Ok(Severity::Emergency),
            other => Err(ParseSeverityError(other.to_string())),
        }
    }
}
