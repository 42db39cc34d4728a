//! Canonical test configurations.
//!
//! Single source of truth for cluster configs used across tests, with probe
//! policies short enough that paused-time tests finish instantly.

use std::sync::Arc;
use std::time::Duration;

use crate::application::config::{ClusterConfig, ClusterConfigBuilder};
use crate::application::probe::ProbePolicy;
use crate::port::runtime::ContainerRuntime;

/// Container liveness: 500ms, polled every 100ms.
pub fn container_probe() -> ProbePolicy {
    ProbePolicy::new(Duration::from_millis(500), Duration::from_millis(100))
}

/// Cluster readiness: 5s, polled every 100ms.
pub fn cluster_probe() -> ProbePolicy {
    ProbePolicy::new(Duration::from_secs(5), Duration::from_millis(100))
}

/// One distinct resource descriptor per worker.
pub fn worker_resources(workers: usize) -> Vec<String> {
    (0..workers)
        .map(|i| format!("cpus(*):{};ports(*):[{}-{}]", i + 1, 31000 + i * 100, 31099 + i * 100))
        .collect()
}

/// `workers` workers with default images and fast probes.
pub fn fast_config(runtime: Arc<dyn ContainerRuntime>, workers: usize) -> ClusterConfig {
    fast_config_with(runtime, workers, |builder| builder)
}

/// Like [`fast_config`], with extra builder options applied last.
pub fn fast_config_with<F>(runtime: Arc<dyn ContainerRuntime>, workers: usize, customize: F) -> ClusterConfig
where
    F: FnOnce(ClusterConfigBuilder) -> ClusterConfigBuilder,
{
    let builder = ClusterConfig::builder()
        .runtime(runtime)
        .workers(workers)
        .worker_resources(worker_resources(workers))
        .container_probe(container_probe())
        .cluster_probe(cluster_probe());
    customize(builder)
        .build()
        .unwrap_or_else(|e| panic!("canonical test config must be valid: {e}"))
}
