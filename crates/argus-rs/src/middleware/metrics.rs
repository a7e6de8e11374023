//! HTTP metrics middleware.
//!
//! Wraps every handler: captures the request size (when the client declares
//! it) before dispatch, then records status code, duration, and response
//! size once the handler returns. Recording is total — the middleware never
//! rejects a request and adds only an atomic add plus a short lock to the
//! request path.

use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderMap, CONTENT_LENGTH},
    Error as ActixError,
};
use futures::future::{LocalBoxFuture, Ready};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::services::metrics::MetricsCollector;

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
}

/// Middleware factory recording per-request metrics into a shared collector.
///
/// # Examples
///
/// ```rust
/// use actix_web::App;
/// use argus_rs::middleware::metrics::RequestMetrics;
/// use argus_rs::services::metrics::MetricsCollector;
///
/// let collector = MetricsCollector::default();
/// let app = App::new().wrap(RequestMetrics::new(collector.clone()));
/// ```
#[derive(Clone)]
pub struct RequestMetrics {
    collector: MetricsCollector,
}

impl RequestMetrics {
    /// Creates the middleware around a shared collector.
    pub fn new(collector: MetricsCollector) -> Self {
        Self { collector }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestMetrics
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = ActixError;
    type Transform = RequestMetricsMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        futures::future::ready(Ok(RequestMetricsMiddleware {
            service: Arc::new(service),
            collector: self.collector.clone(),
        }))
    }
}

/// Middleware instance produced by [`RequestMetrics`].
pub struct RequestMetricsMiddleware<S> {
    service: Arc<S>,
    collector: MetricsCollector,
}

impl<S, B> Service<ServiceRequest> for RequestMetricsMiddleware<S>
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
        let collector = self.collector.clone();

        Box::pin(async move {
            let method = req.method().to_string();
            let path = req.path().to_string();
            if let Some(bytes) = content_length(req.headers()) {
                collector.record_http_request_size(bytes);
            }
            let started = Instant::now();

            match service.call(req).await {
                Ok(response) => {
                    collector.record_http_request(
                        &method,
                        &path,
                        response.status().as_u16(),
                        started.elapsed(),
                    );
                    if let Some(bytes) = content_length(response.headers()) {
                        collector.record_http_response_size(bytes);
                    }
                    Ok(response)
                }
                Err(error) => {
                    // Errored handlers still count, under the status their
                    // error renders as.
                    let status = error.as_response_error().status_code().as_u16();
                    collector.record_http_request(&method, &path, status, started.elapsed());
                    Err(error)
                }
            }
        })
    }
}
