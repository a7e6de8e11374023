//! Periodic health-check supervision with parallel probe fan-out.
//!
//! The [`HealthSupervisor`] owns a dynamic registry of named probes, invokes
//! them in parallel on a fixed interval (each in its own task, bounded by a
//! per-probe timeout), caches the most recent result per probe, and folds the
//! cache into an aggregate status for the health endpoint.
//!
//! Probes are caller-supplied async functions. A probe that times out or
//! panics is contained: the supervisor caches a synthesised unhealthy result
//! and the sweep carries on.

use crate::models::health::{HealthCheckResult, HealthStatus};
use chrono::Utc;
use futures::future::{join_all, BoxFuture};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

/// Hard cap applied by the HTTP probe's client, independent of the
/// supervisor's per-probe timeout. The tighter of the two wins.
const HTTP_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A registered health probe: an async function producing a
/// [`HealthCheckResult`]. The supervisor fills in `duration` and
/// `last_checked` on completion.
pub type HealthProbe = Arc<dyn Fn() -> BoxFuture<'static, HealthCheckResult> + Send + Sync>;

/// Timing configuration for the supervisor.
#[derive(Debug, Clone, Copy)]
pub struct HealthSupervisorConfig {
    /// How often the background loop sweeps all probes
    pub interval: Duration,
    /// Deadline applied to each probe invocation
    pub per_probe_timeout: Duration,
}

impl Default for HealthSupervisorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            per_probe_timeout: Duration::from_secs(10),
        }
    }
}

struct SupervisorInner {
    config: HealthSupervisorConfig,
    probes: RwLock<HashMap<String, HealthProbe>>,
    results: RwLock<HashMap<String, HealthCheckResult>>,
    stopped: AtomicBool,
    stop_signal: Notify,
}

/// Supervisor owning the probe registry, the result cache, and the periodic
/// sweep loop.
///
/// Cheap to clone; all state is shared behind an `Arc`. Construct once at
/// startup, register probes, call [`start`](HealthSupervisor::start), and
/// hand clones to the health endpoint.
///
/// # Examples
///
/// ```rust
/// use argus_rs::models::health::HealthCheckResult;
/// use argus_rs::services::health::{HealthSupervisor, HealthSupervisorConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let supervisor = HealthSupervisor::new(HealthSupervisorConfig::default());
/// supervisor.register_fn("queue", || async {
///     HealthCheckResult::healthy("queue responsive")
/// });
///
/// let results = supervisor.check().await;
/// assert_eq!(results.len(), 1);
/// # }
/// ```
#[derive(Clone)]
pub struct HealthSupervisor {
    inner: Arc<SupervisorInner>,
}

impl HealthSupervisor {
    /// Creates a supervisor with the given timing configuration. The
    /// background loop does not run until [`start`](Self::start) is called.
    pub fn new(config: HealthSupervisorConfig) -> Self {
        Self {
            inner: Arc::new(SupervisorInner {
                config,
                probes: RwLock::new(HashMap::new()),
                results: RwLock::new(HashMap::new()),
                stopped: AtomicBool::new(false),
                stop_signal: Notify::new(),
            }),
        }
    }

    /// Installs `probe` under `name`, replacing any probe already registered
    /// with that name. Silently ignored once the supervisor is stopped.
    pub fn register(&self, name: impl Into<String>, probe: HealthProbe) {
        if self.inner.stopped.load(Ordering::SeqCst) {
            debug!("ignoring probe registration after stop");
            return;
        }
        self.inner
            .probes
            .write()
            .unwrap()
            .insert(name.into(), probe);
    }

    /// Convenience wrapper over [`register`](Self::register) for plain async
    /// closures.
    pub fn register_fn<F, Fut>(&self, name: impl Into<String>, probe: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HealthCheckResult> + Send + 'static,
    {
        self.register(name, Arc::new(move || Box::pin(probe())));
    }

    /// Removes the probe and its cached result.
    pub fn unregister(&self, name: &str) {
        self.inner.probes.write().unwrap().remove(name);
        self.inner.results.write().unwrap().remove(name);
    }

    /// Runs every registered probe in parallel and returns the combined
    /// results, caching each one.
    ///
    /// Each probe runs in its own task under
    /// `tokio::time::timeout(per_probe_timeout)`; the registry lock is
    /// released before any probe code runs. A timed-out probe yields a
    /// synthesised unhealthy result, and a panicking probe is contained the
    /// same way — `check` itself never fails.
    ///
    /// Returns an empty map once the supervisor is stopped.
    pub async fn check(&self) -> HashMap<String, HealthCheckResult> {
        if self.inner.stopped.load(Ordering::SeqCst) {
            return HashMap::new();
        }

        let probes: Vec<(String, HealthProbe)> = self
            .inner
            .probes
            .read()
            .unwrap()
            .iter()
            .map(|(name, probe)| (name.clone(), probe.clone()))
            .collect();

        let timeout = self.inner.config.per_probe_timeout;
        let sweeps = probes.into_iter().map(|(name, probe)| async move {
            let started = Instant::now();
            let outcome = tokio::spawn(tokio::time::timeout(timeout, probe())).await;
            let elapsed = started.elapsed();

            let mut result = match outcome {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => {
                    warn!("health probe '{}' timed out after {:?}", name, timeout);
                    HealthCheckResult::unhealthy(format!(
                        "health check timed out after {}ms",
                        timeout.as_millis()
                    ))
                }
                Err(join_error) if join_error.is_panic() => {
                    warn!("health probe '{}' panicked", name);
                    HealthCheckResult::unhealthy(format!("health check panicked: {}", join_error))
                }
                Err(join_error) => {
                    HealthCheckResult::unhealthy(format!("health check aborted: {}", join_error))
                }
            };
            result.duration = elapsed;
            result.last_checked = Utc::now();
            (name, result)
        });

        let completed: HashMap<String, HealthCheckResult> =
            join_all(sweeps).await.into_iter().collect();

        {
            let mut cache = self.inner.results.write().unwrap();
            for (name, result) in &completed {
                cache.insert(name.clone(), result.clone());
            }
        }

        completed
    }

    /// Copy of the cached per-probe results.
    pub fn get_results(&self) -> HashMap<String, HealthCheckResult> {
        self.inner.results.read().unwrap().clone()
    }

    /// Aggregate of the cached results: unhealthy if any probe is unhealthy,
    /// else degraded if any is degraded, else healthy (an empty registry is
    /// healthy).
    pub fn get_overall_status(&self) -> HealthStatus {
        let results = self.inner.results.read().unwrap();
        HealthStatus::aggregate(results.values().map(|result| &result.status))
    }

    /// Spawns the background loop: one immediate sweep, then one every
    /// configured interval, until [`stop`](Self::stop).
    pub fn start(&self) {
        let supervisor = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(supervisor.inner.config.interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if supervisor.inner.stopped.load(Ordering::SeqCst) {
                            break;
                        }
                        let results = supervisor.check().await;
                        debug!("health sweep completed for {} probes", results.len());
                    }
                    _ = supervisor.inner.stop_signal.notified() => break,
                }
            }
        });
    }

    /// Stops the background loop. Idempotent: the stop signal is fired at
    /// most once, and subsequent registrations are ignored.
    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::SeqCst) {
            self.inner.stop_signal.notify_waiters();
            info!("health supervisor stopped");
        }
    }

    /// True once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }
}

static PROBE_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .timeout(HTTP_PROBE_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
});

/// Builds a probe that maps a ping function's success or failure to
/// healthy or unhealthy.
///
/// # Examples
///
/// ```rust
/// use argus_rs::services::health::database_probe;
///
/// let probe = database_probe(|| async { Ok::<_, std::io::Error>(()) });
/// ```
pub fn database_probe<F, Fut, E>(ping: F) -> HealthProbe
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send,
{
    Arc::new(move || {
        let ping = ping();
        Box::pin(async move {
            match ping.await {
                Ok(()) => HealthCheckResult::healthy("database reachable"),
                Err(error) => {
                    HealthCheckResult::unhealthy(format!("database ping failed: {}", error))
                }
            }
        })
    })
}

/// Builds a probe that issues a GET against `url` and reports healthy only
/// when the endpoint is reachable and answers with `expected_status`.
///
/// The request carries a 5-second client timeout in addition to the
/// supervisor's per-probe deadline; whichever is tighter applies.
pub fn http_probe(url: impl Into<String>, expected_status: u16) -> HealthProbe {
    let url = url.into();
    Arc::new(move || {
        let url = url.clone();
        Box::pin(async move {
            match PROBE_CLIENT.get(&url).send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if status == expected_status {
                        HealthCheckResult::healthy(format!("{} answered {}", url, status))
                    } else {
                        HealthCheckResult::unhealthy(format!(
                            "{} answered {} (expected {})",
                            url, status, expected_status
                        ))
                        .with_detail("status", status)
                    }
                }
                Err(error) => {
                    HealthCheckResult::unhealthy(format!("{} unreachable: {}", url, error))
                }
            }
        })
    })
}

/// Builds a probe that samples resident memory against a megabyte budget:
/// healthy below 80% of the limit, degraded between 80% and 100%, unhealthy
/// above it.
pub fn memory_probe(max_mb: u64) -> HealthProbe {
    Arc::new(move || {
        Box::pin(async move {
            match memory_stats::memory_stats() {
                Some(usage) => {
                    let used_mb = usage.physical_mem as f64 / (1024.0 * 1024.0);
                    let limit_mb = max_mb as f64;
                    let message =
                        format!("resident memory {:.1}MB of {}MB budget", used_mb, max_mb);
                    let result = if used_mb < limit_mb * 0.8 {
                        HealthCheckResult::healthy(message)
                    } else if used_mb <= limit_mb {
                        HealthCheckResult::degraded(message)
                    } else {
                        HealthCheckResult::unhealthy(message)
                    };
                    result
                        .with_detail("used_mb", used_mb.round() as u64)
                        .with_detail("limit_mb", max_mb)
                }
                None => {
                    HealthCheckResult::degraded("resident memory unavailable on this platform")
                }
            }
        })
    })
}
