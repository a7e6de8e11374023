//! Request tracing middleware.
//!
//! Starts a span per inbound request — a root span, or a child when the
//! upstream caller supplied propagation headers — attaches it to the request
//! extensions for handlers to chain off, and finishes it when the handler
//! returns. Finishing rides a drop guard, so the span is closed exactly once
//! even on error paths or an unwinding handler.

use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue},
    Error as ActixError, HttpMessage, HttpRequest,
};
use futures::future::{LocalBoxFuture, Ready};
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::models::severity::Severity;
use crate::services::tracer::{Span, TraceContext, Tracer};

/// Header carrying the trace identifier, inbound and outbound.
pub const TRACE_ID_HEADER: &str = "x-trace-id";
/// Header carrying the caller's span identifier.
pub const SPAN_ID_HEADER: &str = "x-span-id";

/// Returns the trace context attached to a request, or an empty one when the
/// tracing middleware is not installed.
pub fn trace_context(req: &HttpRequest) -> TraceContext {
    req.extensions()
        .get::<TraceContext>()
        .cloned()
        .unwrap_or_default()
}

/// Returns the span the tracing middleware attached to this request, if any.
pub fn current_span(req: &HttpRequest) -> Option<Span> {
    req.extensions().get::<Span>().cloned()
}

fn header_value(req: &ServiceRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

/// Finishes the span on drop so the middleware cannot leak an open span,
/// whichever way the handler future resolves.
struct SpanFinisher {
    tracer: Tracer,
    span: Span,
}

impl Drop for SpanFinisher {
    fn drop(&mut self) {
        self.tracer.finish_span(&self.span);
    }
}

/// Middleware factory starting one span per request.
///
/// # Examples
///
/// ```rust
/// use actix_web::App;
/// use argus_rs::middleware::tracing::RequestTracing;
/// use argus_rs::services::tracer::Tracer;
///
/// let tracer = Tracer::default();
/// let app = App::new().wrap(RequestTracing::new(tracer.clone()));
/// ```
#[derive(Clone)]
pub struct RequestTracing {
    tracer: Tracer,
}

impl RequestTracing {
    /// Creates the middleware around a shared tracer.
    pub fn new(tracer: Tracer) -> Self {
        Self { tracer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestTracing
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Transform = RequestTracingMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        futures::future::ready(Ok(RequestTracingMiddleware {
            service: Arc::new(service),
            tracer: self.tracer.clone(),
        }))
    }
}

/// Middleware instance produced by [`RequestTracing`].
pub struct RequestTracingMiddleware<S> {
    service: Arc<S>,
    tracer: Tracer,
}

impl<S, B> Service<ServiceRequest> for RequestTracingMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let tracer = self.tracer.clone();

        Box::pin(async move {
            let operation = format!("{} {}", req.method(), req.path());
            let upstream = match (
                header_value(&req, TRACE_ID_HEADER),
                header_value(&req, SPAN_ID_HEADER),
            ) {
                (Some(trace_id), Some(span_id)) => TraceContext::from_remote(trace_id, span_id),
                _ => TraceContext::new(),
            };

            let (context, span) = tracer.start_span(&upstream, &operation);
            span.add_tag("http.method", req.method().to_string());
            req.extensions_mut().insert(context);
            req.extensions_mut().insert(span.clone());

            let finisher = SpanFinisher {
                tracer,
                span: span.clone(),
            };

            match service.call(req).await {
                Ok(mut response) => {
                    let status = response.status();
                    span.add_tag("http.status_code", status.as_u16().to_string());
                    if status.is_server_error() {
                        span.set_error(format!("handler answered {}", status));
                    } else {
                        span.set_status(Severity::Ok);
                    }

                    if let Ok(value) = HeaderValue::from_str(span.trace_id()) {
                        response
                            .headers_mut()
                            .insert(HeaderName::from_static(TRACE_ID_HEADER), value);
                    }

                    drop(finisher);
                    Ok(response)
                }
                Err(error) => {
                    span.set_error(&error);
                    drop(finisher);
                    Err(error)
                }
            }
        })
    }
}
