//! Hierarchical span tracing with severity-graded events.
//!
//! A [`Span`] records one timed operation: trace/parent/span identifiers,
//! tags, ordered events, and a terminal status. Spans are threaded through a
//! request-scoped [`TraceContext`], so a child started from a context carrying
//! span P inherits P's trace id and records P as its parent.
//!
//! A span is `Active` until [`Tracer::finish_span`] runs, which stamps the
//! end time and hands a [`SpanRecord`] to the exporter exactly once. Every
//! operation on a finished span is a silent no-op, and exporter failures are
//! swallowed (logged at `warn`) — tracing is best-effort and never surfaces
//! errors to the request path.

use crate::models::severity::Severity;
use chrono::{DateTime, Utc};
use log::warn;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// One timestamped, severity-graded event inside a span.
#[derive(Debug, Clone, Serialize)]
pub struct SpanEvent {
    /// When the event was appended (monotonically non-decreasing per span)
    pub timestamp: DateTime<Utc>,
    /// Severity grade of the event
    pub severity: Severity,
    /// Event message
    pub message: String,
    /// Structured payload attached to the event
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub fields: HashMap<String, serde_json::Value>,
}

/// Immutable copy of a finished span, as delivered to the exporter and
/// rendered by operator tooling.
#[derive(Debug, Clone, Serialize)]
pub struct SpanRecord {
    pub trace_id: String,
    pub span_id: String,
    /// Empty string for root spans
    pub parent_span_id: String,
    pub operation_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub tags: HashMap<String, String>,
    pub status: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub events: Vec<SpanEvent>,
}

impl SpanRecord {
    /// Wall-clock duration of the span in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        (self.end_time - self.start_time).num_milliseconds()
    }
}

struct SpanState {
    end_time: Option<DateTime<Utc>>,
    tags: HashMap<String, String>,
    status: Severity,
    error: Option<String>,
    events: Vec<SpanEvent>,
}

struct SpanInner {
    trace_id: String,
    span_id: String,
    parent_span_id: String,
    operation_name: String,
    start_time: DateTime<Utc>,
    finished: AtomicBool,
    state: Mutex<SpanState>,
}

/// Handle to an in-flight operation record.
///
/// Cloning is cheap (the handle is an `Arc`); all clones refer to the same
/// span. Mutating operations are thread-safe and become no-ops once the span
/// is finished.
#[derive(Clone)]
pub struct Span {
    inner: Arc<SpanInner>,
}

impl Span {
    fn new(
        trace_id: String,
        span_id: String,
        parent_span_id: String,
        operation_name: &str,
    ) -> Self {
        Self {
            inner: Arc::new(SpanInner {
                trace_id,
                span_id,
                parent_span_id,
                operation_name: operation_name.to_string(),
                start_time: Utc::now(),
                finished: AtomicBool::new(false),
                state: Mutex::new(SpanState {
                    end_time: None,
                    tags: HashMap::new(),
                    status: Severity::Unset,
                    error: None,
                    events: Vec::new(),
                }),
            }),
        }
    }

    /// Identifier shared by every span in this trace.
    pub fn trace_id(&self) -> &str {
        &self.inner.trace_id
    }

    /// Identifier unique to this span.
    pub fn span_id(&self) -> &str {
        &self.inner.span_id
    }

    /// Parent span identifier; empty for root spans.
    pub fn parent_span_id(&self) -> &str {
        &self.inner.parent_span_id
    }

    /// Operation this span measures.
    pub fn operation_name(&self) -> &str {
        &self.inner.operation_name
    }

    /// When the span was started.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.inner.start_time
    }

    /// When the span finished; `None` while it is still active.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.inner.state.lock().unwrap().end_time
    }

    /// True once the span has been finished.
    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::SeqCst)
    }

    /// Merges `tags` into the span's tag mapping. No-op once finished.
    pub fn add_tags(&self, tags: &HashMap<String, String>) {
        let mut state = self.inner.state.lock().unwrap();
        if self.inner.finished.load(Ordering::SeqCst) {
            return;
        }
        for (key, value) in tags {
            state.tags.insert(key.clone(), value.clone());
        }
    }

    /// Sets a single tag. No-op once finished.
    pub fn add_tag(&self, key: impl Into<String>, value: impl Into<String>) {
        let mut state = self.inner.state.lock().unwrap();
        if self.inner.finished.load(Ordering::SeqCst) {
            return;
        }
        state.tags.insert(key.into(), value.into());
    }

    /// Overwrites the span's terminal status. No-op once finished.
    pub fn set_status(&self, status: Severity) {
        let mut state = self.inner.state.lock().unwrap();
        if self.inner.finished.load(Ordering::SeqCst) {
            return;
        }
        state.status = status;
    }

    /// Appends a severity-graded event.
    ///
    /// Event timestamps are clamped to be monotonically non-decreasing
    /// within the span even if the wall clock steps backwards. No-op once
    /// finished.
    pub fn log_event(
        &self,
        severity: Severity,
        message: impl Into<String>,
        fields: HashMap<String, serde_json::Value>,
    ) {
        let mut state = self.inner.state.lock().unwrap();
        if self.inner.finished.load(Ordering::SeqCst) {
            return;
        }
        let mut timestamp = Utc::now();
        if let Some(last) = state.events.last() {
            if timestamp < last.timestamp {
                timestamp = last.timestamp;
            }
        }
        state.events.push(SpanEvent {
            timestamp,
            severity,
            message: message.into(),
            fields,
        });
    }

    /// Marks the span failed: status becomes [`Severity::Error`], the error
    /// text is stored, and an error event is appended. No-op once finished.
    pub fn set_error(&self, error: impl std::fmt::Display) {
        let text = error.to_string();
        {
            let mut state = self.inner.state.lock().unwrap();
            if self.inner.finished.load(Ordering::SeqCst) {
                return;
            }
            state.status = Severity::Error;
            state.error = Some(text.clone());
        }
        self.log_event(Severity::Error, text, HashMap::new());
    }
}

/// Request-scoped carrier for the current span.
///
/// A fresh context has no span; [`Tracer::start_span`] returns a new context
/// carrying the started span so children can chain off it. A context seeded
/// with [`TraceContext::from_remote`] makes the next started span a child of
/// an upstream caller's span.
#[derive(Clone, Default)]
pub struct TraceContext {
    current: Option<Span>,
    remote_trace_id: Option<String>,
    remote_span_id: Option<String>,
}

impl TraceContext {
    /// Context with no current span; the next span started from it is a
    /// trace root.
    pub fn new() -> Self {
        Self::default()
    }

    /// Context carrying upstream propagation identifiers. The next span
    /// started from it joins the remote trace as a child of the remote span.
    pub fn from_remote(trace_id: impl Into<String>, span_id: impl Into<String>) -> Self {
        Self {
            current: None,
            remote_trace_id: Some(trace_id.into()),
            remote_span_id: Some(span_id.into()),
        }
    }

    /// The span attached to this context, if any.
    pub fn current_span(&self) -> Option<&Span> {
        self.current.as_ref()
    }
}

/// Error surfaced by an exporter. The tracer logs and swallows it.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The exporter failed to deliver the span
    #[error("span export failed: {0}")]
    Delivery(String),
}

/// Destination for finished spans.
///
/// Implementations must be thread-safe: `finish_span` may run on any worker.
/// An exporter may buffer and flush asynchronously, but `export` itself must
/// not block the finishing caller.
pub trait SpanExporter: Send + Sync {
    /// Delivers one finished span.
    fn export(&self, span: &SpanRecord) -> Result<(), ExportError>;
}

/// Default exporter: discards every span.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopExporter;

impl SpanExporter for NoopExporter {
    fn export(&self, _span: &SpanRecord) -> Result<(), ExportError> {
        Ok(())
    }
}

/// Exporter bridging finished spans onto the `log` crate.
///
/// Severity codes map to log levels: `error` (50) and above log at `Error`,
/// `warn` at `Warn`, `ok`/`info`/`notice` at `Info`, `debug` at `Debug`, and
/// everything else at `Trace`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogExporter;

impl LogExporter {
    fn level_for(status: Severity) -> log::Level {
        if status.is_error() {
            return log::Level::Error;
        }
        match status {
            Severity::Warn => log::Level::Warn,
            Severity::Ok | Severity::Info | Severity::Notice => log::Level::Info,
            Severity::Debug => log::Level::Debug,
            _ => log::Level::Trace,
        }
    }
}

impl SpanExporter for LogExporter {
    fn export(&self, span: &SpanRecord) -> Result<(), ExportError> {
        log::log!(
            Self::level_for(span.status),
            "span finished: operation={} trace_id={} span_id={} parent={} duration_ms={} status={} events={}",
            span.operation_name,
            span.trace_id,
            span.span_id,
            if span.parent_span_id.is_empty() { "-" } else { span.parent_span_id.as_str() },
            span.duration_ms(),
            span.status,
            span.events.len(),
        );
        Ok(())
    }
}

/// Span factory and finisher, parameterised by an exporter.
///
/// Cheap to clone and share; the tracer itself holds no per-request state.
///
/// # Examples
///
/// ```rust
/// use argus_rs::services::tracer::{TraceContext, Tracer};
///
/// let tracer = Tracer::default();
/// let (ctx, parent) = tracer.start_span(&TraceContext::new(), "handle_request");
/// let (_ctx, child) = tracer.start_span(&ctx, "query_backend");
///
/// assert_eq!(child.trace_id(), parent.trace_id());
/// assert_eq!(child.parent_span_id(), parent.span_id());
///
/// tracer.finish_span(&child);
/// tracer.finish_span(&parent);
/// ```
#[derive(Clone)]
pub struct Tracer {
    exporter: Arc<dyn SpanExporter>,
}

impl Default for Tracer {
    fn default() -> Self {
        Self::new(Arc::new(NoopExporter))
    }
}

impl Tracer {
    /// Creates a tracer delivering finished spans to `exporter`.
    pub fn new(exporter: Arc<dyn SpanExporter>) -> Self {
        Self { exporter }
    }

    /// Starts a span named `operation`.
    ///
    /// The trace id is inherited from the context's span (or its remote
    /// identifiers), minting a fresh one for roots; the parent span id is the
    /// attached span's id, empty for roots. Returns the started span and a
    /// new context carrying it.
    pub fn start_span(&self, context: &TraceContext, operation: &str) -> (TraceContext, Span) {
        let (trace_id, parent_span_id) = match context.current_span() {
            Some(parent) => (parent.trace_id().to_string(), parent.span_id().to_string()),
            None => match (&context.remote_trace_id, &context.remote_span_id) {
                (Some(trace_id), Some(span_id)) => (trace_id.clone(), span_id.clone()),
                _ => (new_id(), String::new()),
            },
        };

        let span = Span::new(trace_id, new_id(), parent_span_id, operation);
        let next = TraceContext {
            current: Some(span.clone()),
            remote_trace_id: None,
            remote_span_id: None,
        };
        (next, span)
    }

    /// Finishes the span: stamps the end time and delivers the record to the
    /// exporter. The first call wins; repeat calls are no-ops, so a span is
    /// exported exactly once. Exporter errors are logged and swallowed.
    pub fn finish_span(&self, span: &Span) {
        if span.inner.finished.swap(true, Ordering::SeqCst) {
            return;
        }

        let record = {
            let mut state = span.inner.state.lock().unwrap();
            let mut end_time = Utc::now();
            if end_time < span.inner.start_time {
                end_time = span.inner.start_time;
            }
            if let Some(last) = state.events.last() {
                if end_time < last.timestamp {
                    end_time = last.timestamp;
                }
            }
            state.end_time = Some(end_time);

            SpanRecord {
                trace_id: span.inner.trace_id.clone(),
                span_id: span.inner.span_id.clone(),
                parent_span_id: span.inner.parent_span_id.clone(),
                operation_name: span.inner.operation_name.clone(),
                start_time: span.inner.start_time,
                end_time,
                tags: state.tags.clone(),
                status: state.status,
                error: state.error.clone(),
                events: state.events.clone(),
            }
        };

        if let Err(error) = self.exporter.export(&record) {
            warn!(
                "dropping span '{}' after export failure: {}",
                record.operation_name, error
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_distinct() {
        let tracer = Tracer::default();
        let (_, a) = tracer.start_span(&TraceContext::new(), "a");
        let (_, b) = tracer.start_span(&TraceContext::new(), "b");
        assert_ne!(a.span_id(), b.span_id());
        assert_ne!(a.trace_id(), b.trace_id());
    }

    #[test]
    fn test_remote_context_seeds_parentage() {
        let tracer = Tracer::default();
        let context = TraceContext::from_remote("trace-upstream", "span-upstream");
        let (_, span) = tracer.start_span(&context, "downstream");

        assert_eq!(span.trace_id(), "trace-upstream");
        assert_eq!(span.parent_span_id(), "span-upstream");
    }

    #[test]
    fn test_finished_span_ignores_mutation() {
        let tracer = Tracer::default();
        let (_, span) = tracer.start_span(&TraceContext::new(), "op");
        tracer.finish_span(&span);

        span.set_status(Severity::Critical);
        span.add_tag("late", "true");
        span.log_event(Severity::Info, "late event", HashMap::new());

        // Re-finishing is a no-op too; state stays as frozen at first finish.
        tracer.finish_span(&span);
        let state = span.inner.state.lock().unwrap();
        assert_eq!(state.status, Severity::Unset);
        assert!(state.tags.is_empty());
        assert!(state.events.is_empty());
    }
}
