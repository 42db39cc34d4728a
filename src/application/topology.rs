//! Container specs for each cluster role.
//!
//! Members find each other by container IP: the master is pointed at the
//! coordination service, workers at the master.

use super::config::ClusterConfig;
use crate::domain::{ContainerSpec, PortBinding, Role};

/// Client port of the coordination service.
pub const COORDINATION_PORT: u16 = 2181;
/// Port workers listen on.
pub const WORKER_PORT: u16 = 5051;

/// `minicluster-<role>-<cluster id>[-<index>]`
#[must_use]
pub fn container_name(cluster_id: &str, role: Role, index: Option<usize>) -> String {
    match index {
        Some(i) => format!("minicluster-{role}-{cluster_id}-{i}"),
        None => format!("minicluster-{role}-{cluster_id}"),
    }
}

/// Coordination-service URL the master registers under.
#[must_use]
pub fn coordination_url(coordination_ip: &str, zk_path: &str) -> String {
    format!(
        "zk://{coordination_ip}:{COORDINATION_PORT}/{}",
        zk_path.trim_start_matches('/')
    )
}

/// The coordination service, reachable on its client port inside the network.
pub fn coordination_spec(config: &ClusterConfig, cluster_id: &str) -> ContainerSpec {
    let spec = ContainerSpec::new(
        cluster_id,
        Role::Coordination,
        container_name(cluster_id, Role::Coordination, None),
        config.images().coordination.to_string(),
    )
    .port(PortBinding::internal(COORDINATION_PORT));
    with_extra_env(spec, config)
}

/// The master, pointed at the coordination service. Publishes its port on
/// the host when port mapping is on.
pub fn master_spec(config: &ClusterConfig, cluster_id: &str, coordination_ip: &str) -> ContainerSpec {
    let port = config.master_port();
    let binding = if config.map_ports_to_host() {
        PortBinding::published(port)
    } else {
        PortBinding::internal(port)
    };

    let spec = ContainerSpec::new(
        cluster_id,
        Role::Master,
        container_name(cluster_id, Role::Master, None),
        config.images().master.to_string(),
    )
    .env("MESOS_ZK", coordination_url(coordination_ip, config.zk_path()))
    .env("MESOS_PORT", port.to_string())
    .env("MESOS_QUORUM", "1")
    .env("MESOS_CLUSTER", format!("minicluster-{cluster_id}"))
    .env("MESOS_REGISTRY", "in_memory")
    .env("MESOS_WORK_DIR", "/var/lib/mesos")
    .env("MESOS_LOGGING_LEVEL", "INFO")
    .port(binding);
    with_extra_env(spec, config)
}

/// Spec for worker `index`; the index selects its resource descriptor.
pub fn worker_spec(
    config: &ClusterConfig,
    cluster_id: &str,
    index: usize,
    master_ip: &str,
) -> ContainerSpec {
    let resources = config
        .worker_resources()
        .get(index)
        .cloned()
        .unwrap_or_default();

    let spec = ContainerSpec::new(
        cluster_id,
        Role::Worker,
        container_name(cluster_id, Role::Worker, Some(index)),
        config.images().worker.to_string(),
    )
    .env("MESOS_MASTER", format!("{master_ip}:{}", config.master_port()))
    .env("MESOS_PORT", WORKER_PORT.to_string())
    .env("MESOS_RESOURCES", resources)
    .env("MESOS_CONTAINERIZERS", "mesos")
    .env("MESOS_WORK_DIR", "/tmp/mesos")
    .env("MESOS_LOGGING_LEVEL", "INFO")
    .port(PortBinding::internal(WORKER_PORT));
    with_extra_env(spec, config)
}

/// Extra environment is applied last and overrides role defaults.
fn with_extra_env(spec: ContainerSpec, config: &ClusterConfig) -> ContainerSpec {
    config
        .environment()
        .iter()
        .fold(spec, |spec, (k, v)| spec.env(k.clone(), v.clone()))
}
