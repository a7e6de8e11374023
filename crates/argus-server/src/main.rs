//! Argus observability server
//!
//! Reference binary wiring the argus-rs observability core into an actix-web
//! application: the metrics collector, health supervisor, and tracer are
//! constructed once here and injected into the middleware and operator
//! endpoints. There are no global collectors — everything flows through
//! application data.

use argus_rs::logs::logger::configure_logger;
use argus_rs::middleware::metrics::RequestMetrics;
use argus_rs::middleware::tracing::RequestTracing;
use argus_rs::routes::{health, metrics, observability};
use argus_rs::services::health::{
    http_probe, memory_probe, HealthSupervisor, HealthSupervisorConfig,
};
use argus_rs::services::metrics::MetricsCollector;
use argus_rs::services::system_monitor::SystemSampler;
use argus_rs::services::tracer::{LogExporter, Tracer};

use actix_web::{web, App, HttpResponse, HttpServer, Result};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

/// Minimal demonstration handler so the middleware has something to wrap.
async fn index() -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "service": "argus-server",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    configure_logger();

    info!("Starting argus-server v{}", env!("CARGO_PKG_VERSION"));

    // Observability core, constructed once and injected everywhere.
    let metrics_collector = MetricsCollector::default();
    let tracer = Tracer::new(Arc::new(LogExporter));

    let supervisor = HealthSupervisor::new(HealthSupervisorConfig::default());
    supervisor.register("memory", memory_probe(1024));
    if let Ok(url) = std::env::var("ARGUS_UPSTREAM_HEALTH_URL") {
        info!("Registering upstream health probe for {}", url);
        supervisor.register("upstream", http_probe(url, 200));
    }
    supervisor.start();

    // Feed the system gauges in the background.
    let sampler = SystemSampler::new(metrics_collector.clone(), Duration::from_secs(15));
    let sampler_handle = sampler.start();

    let host = std::env::var("ARGUS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("ARGUS_PORT")
        .unwrap_or_else(|_| "5900".to_string())
        .parse::<u16>()
        .unwrap_or(5900);

    info!("Starting server on {}:{}", host, port);

    let collector_data = metrics_collector.clone();
    let supervisor_data = supervisor.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(collector_data.clone()))
            .app_data(web::Data::new(supervisor_data.clone()))
            .wrap(RequestMetrics::new(collector_data.clone()))
            .wrap(RequestTracing::new(tracer.clone()))
            .configure(health::configure_health)
            .configure(metrics::configure_metrics)
            .configure(observability::configure_observability)
            .route("/", web::get().to(index))
    })
    .bind((host.as_str(), port))?
    .run();

    info!("Server started successfully");

    // Graceful shutdown handling
    tokio::select! {
        result = server => {
            match result {
                Ok(_) => info!("Server stopped gracefully"),
                Err(e) => error!("Server error: {}", e),
            }
        }
        _ = signal::ctrl_c() => {
            info!("Received shutdown signal, stopping server...");
        }
    }

    supervisor.stop();
    sampler_handle.abort();

    Ok(())
}
