//! Integration tests for the health supervisor.
//!
//! Covers aggregation across probes, probe replacement and removal, timeout
//! and panic containment, stop idempotence, and randomized aggregation.

use argus_rs::models::health::{HealthCheckResult, HealthStatus};
use argus_rs::services::health::{database_probe, HealthSupervisor, HealthSupervisorConfig};
use rand::Rng;
use std::time::Duration;

fn quick_config() -> HealthSupervisorConfig {
    HealthSupervisorConfig {
        interval: Duration::from_millis(50),
        per_probe_timeout: Duration::from_millis(50),
    }
}

#[tokio::test]
async fn test_aggregation_across_probes() {
    let supervisor = HealthSupervisor::new(HealthSupervisorConfig::default());

    supervisor.register_fn("alpha", || async { HealthCheckResult::healthy("ok") });
    supervisor.register_fn("beta", || async { HealthCheckResult::healthy("ok") });
    supervisor.register_fn("gamma", || async { HealthCheckResult::degraded("slow") });

    supervisor.check().await;
    assert_eq!(supervisor.get_overall_status(), HealthStatus::Degraded);

    // Replacing a probe under the same name takes effect on the next sweep.
    supervisor.register_fn("gamma", || async { HealthCheckResult::unhealthy("down") });
    supervisor.check().await;
    assert_eq!(supervisor.get_overall_status(), HealthStatus::Unhealthy);

    // Removing the failing probe drops its cached result too.
    supervisor.unregister("gamma");
    assert_eq!(supervisor.get_overall_status(), HealthStatus::Healthy);
    assert_eq!(supervisor.get_results().len(), 2);
}

#[tokio::test]
async fn test_empty_registry_is_healthy() {
    let supervisor = HealthSupervisor::new(HealthSupervisorConfig::default());
    assert_eq!(supervisor.get_overall_status(), HealthStatus::Healthy);
    assert!(supervisor.check().await.is_empty());
}

#[tokio::test]
async fn test_slow_probe_times_out() {
    let supervisor = HealthSupervisor::new(quick_config());

    supervisor.register_fn("slow", || async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        HealthCheckResult::healthy("too late")
    });

    let results = supervisor.check().await;
    let slow = &results["slow"];

    assert_eq!(slow.status, HealthStatus::Unhealthy);
    assert!(slow.message.contains("timed out"));
    // Cut off at the 50ms deadline, not the probe's 200ms sleep.
    assert!(slow.duration < Duration::from_millis(150));

    // The synthesised result is cached like any other.
    assert_eq!(supervisor.get_results()["slow"].status, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_timeout_does_not_abort_fanout() {
    let supervisor = HealthSupervisor::new(quick_config());

    supervisor.register_fn("slow", || async {
        tokio::time::sleep(Duration::from_millis(200)).await;
        HealthCheckResult::healthy("too late")
    });
    supervisor.register_fn("fast", || async { HealthCheckResult::healthy("ok") });

    let results = supervisor.check().await;
    assert_eq!(results.len(), 2);
    assert_eq!(results["fast"].status, HealthStatus::Healthy);
    assert_eq!(results["slow"].status, HealthStatus::Unhealthy);
}

#[tokio::test]
async fn test_panicking_probe_is_contained() {
    let supervisor = HealthSupervisor::new(HealthSupervisorConfig::default());

    supervisor.register_fn("explosive", || async { panic!("probe blew up") });
    supervisor.register_fn("calm", || async { HealthCheckResult::healthy("ok") });

    let results = supervisor.check().await;
    assert_eq!(results["explosive"].status, HealthStatus::Unhealthy);
    assert!(results["explosive"].message.contains("panicked"));
    assert_eq!(results["calm"].status, HealthStatus::Healthy);
}

#[tokio::test]
async fn test_probe_results_carry_timing() {
    let supervisor = HealthSupervisor::new(HealthSupervisorConfig::default());
    let before = chrono::Utc::now();

    supervisor.register_fn("timed", || async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        HealthCheckResult::healthy("ok")
    });

    let results = supervisor.check().await;
    let timed = &results["timed"];
    assert!(timed.duration >= Duration::from_millis(20));
    assert!(timed.last_checked >= before);
}

#[tokio::test]
async fn test_stop_is_idempotent() {
    let supervisor = HealthSupervisor::new(quick_config());
    supervisor.register_fn("alpha", || async { HealthCheckResult::healthy("ok") });
    supervisor.start();

    supervisor.stop();
    supervisor.stop();
    supervisor.stop();
    assert!(supervisor.is_stopped());

    // Registrations after stop are silently ignored; check returns empty.
    supervisor.register_fn("late", || async { HealthCheckResult::healthy("ok") });
    assert!(supervisor.check().await.is_empty());
}

#[tokio::test]
async fn test_background_loop_runs_initial_check() {
    let supervisor = HealthSupervisor::new(HealthSupervisorConfig {
        interval: Duration::from_secs(60),
        per_probe_timeout: Duration::from_millis(500),
    });
    supervisor.register_fn("alpha", || async { HealthCheckResult::healthy("ok") });

    supervisor.start();
    // The first sweep fires immediately, well before the 60s interval.
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(supervisor.get_results().len(), 1);
    supervisor.stop();
}

#[tokio::test]
async fn test_database_probe_maps_ping_outcome() {
    let supervisor = HealthSupervisor::new(HealthSupervisorConfig::default());

    supervisor.register("db_up", database_probe(|| async { Ok::<_, std::io::Error>(()) }));
    supervisor.register(
        "db_down",
        database_probe(|| async {
            Err::<(), _>(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))
        }),
    );

    let results = supervisor.check().await;
    assert_eq!(results["db_up"].status, HealthStatus::Healthy);
    assert_eq!(results["db_down"].status, HealthStatus::Unhealthy);
    assert!(results["db_down"].message.contains("connection refused"));
}

#[tokio::test]
async fn test_randomized_registrations_preserve_aggregation() {
    let mut rng = rand::thread_rng();

    for _ in 0..50 {
        let supervisor = HealthSupervisor::new(HealthSupervisorConfig::default());
        let count = rng.gen_range(0..8);
        let mut statuses = Vec::new();

        for index in 0..count {
            let status = match rng.gen_range(0..3) {
                0 => HealthStatus::Healthy,
                1 => HealthStatus::Degraded,
                _ => HealthStatus::Unhealthy,
            };
            statuses.push(status);
            supervisor.register_fn(format!("probe_{}", index), move || async move {
                match status {
                    HealthStatus::Healthy => HealthCheckResult::healthy("ok"),
                    HealthStatus::Degraded => HealthCheckResult::degraded("meh"),
                    HealthStatus::Unhealthy => HealthCheckResult::unhealthy("bad"),
                }
            });
        }

        supervisor.check().await;

        let expected = if statuses.contains(&HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if statuses.contains(&HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        assert_eq!(supervisor.get_overall_status(), expected);
    }
}
