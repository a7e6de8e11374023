//! Background sampling of the system metric gauges.
//!
//! The collector's system family is overwrite-only, so something has to feed
//! it. The [`SystemSampler`] periodically records the runtime's worker count
//! and the process's resident memory, in the same spawn-plus-interval shape
//! as the health supervisor's sweep loop.

use crate::services::metrics::MetricsCollector;
use log::debug;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Periodic feeder for [`MetricsCollector`] system gauges.
pub struct SystemSampler {
    collector: MetricsCollector,
    interval: Duration,
}

impl SystemSampler {
    /// Creates a sampler that updates the gauges every `interval`.
    pub fn new(collector: MetricsCollector, interval: Duration) -> Self {
        Self {
            collector,
            interval,
        }
    }

    /// Takes one sample immediately.
    pub fn sample(&self) {
        if let Some(usage) = memory_stats::memory_stats() {
            self.collector
                .record_memory_usage(usage.physical_mem as u64);
        }
        let workers = tokio::runtime::Handle::current().metrics().num_workers();
        self.collector.record_worker_tasks(workers);
        debug!("system gauges sampled: {} workers", workers);
    }

    /// Spawns the sampling loop, consuming the sampler. The first sample is
    /// taken on the first tick (immediately); abort the returned handle to
    /// stop sampling.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            loop {
                interval.tick().await;
                self.sample();
            }
        })
    }
}
