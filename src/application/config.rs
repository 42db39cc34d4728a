//! Validated description of the cluster to build.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use super::probe::ProbePolicy;
use crate::error::ConfigError;
use crate::port::runtime::ContainerRuntime;

/// Resolves a runtime when none was supplied explicitly.
pub type RuntimeResolver = fn() -> Result<Arc<dyn ContainerRuntime>, ConfigError>;

pub const DEFAULT_WORKERS: usize = 3;
pub const DEFAULT_MASTER_PORT: u16 = 5050;
pub const DEFAULT_ZK_PATH: &str = "mesos";
/// Resource descriptor handed to a worker when none is configured.
pub const DEFAULT_WORKER_RESOURCES: &str = "ports(*):[31000-32000]";

pub const DEFAULT_COORDINATION_IMAGE: &str = "jplock/zookeeper";
pub const DEFAULT_COORDINATION_TAG: &str = "3.4.6";
pub const DEFAULT_MASTER_IMAGE: &str = "mesosphere/mesos-master";
pub const DEFAULT_MASTER_TAG: &str = "0.22.1-1.0.ubuntu1404";
pub const DEFAULT_WORKER_IMAGE: &str = "mesosphere/mesos-slave";
pub const DEFAULT_WORKER_TAG: &str = "0.22.1-1.0.ubuntu1404";

/// An image name and tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub name: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }

    /// Parse `name[:tag]`, defaulting the tag to `latest`.
    ///
    /// A colon belonging to a registry host (`host:5000/image`) is not a tag
    /// separator.
    pub fn parse(reference: &str) -> Result<Self, ConfigError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "image",
                reason: "image reference is empty".into(),
            });
        }

        match reference.rsplit_once(':') {
            Some((name, tag)) if !tag.contains('/') => {
                if name.is_empty() || tag.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "image",
                        reason: format!("malformed image reference '{reference}'"),
                    });
                }
                Ok(Self::new(name, tag))
            }
            _ => Ok(Self::new(reference, "latest")),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.tag)
    }
}

/// Images used for each role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterImages {
    pub coordination: ImageRef,
    pub master: ImageRef,
    pub worker: ImageRef,
}

impl Default for ClusterImages {
    fn default() -> Self {
        Self {
            coordination: ImageRef::new(DEFAULT_COORDINATION_IMAGE, DEFAULT_COORDINATION_TAG),
            master: ImageRef::new(DEFAULT_MASTER_IMAGE, DEFAULT_MASTER_TAG),
            worker: ImageRef::new(DEFAULT_WORKER_IMAGE, DEFAULT_WORKER_TAG),
        }
    }
}

/// Immutable, validated cluster description.
#[derive(Clone)]
pub struct ClusterConfig {
    runtime: Arc<dyn ContainerRuntime>,
    workers: usize,
    worker_resources: Vec<String>,
    master_port: u16,
    zk_path: String,
    images: ClusterImages,
    worker_build_context: Option<PathBuf>,
    environment: BTreeMap<String, String>,
    map_ports_to_host: bool,
    pull_images: bool,
    container_probe: ProbePolicy,
    cluster_probe: ProbePolicy,
}

impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("runtime", &self.runtime.name())
            .field("workers", &self.workers)
            .field("worker_resources", &self.worker_resources)
            .field("master_port", &self.master_port)
            .field("zk_path", &self.zk_path)
            .field("images", &self.images)
            .field("worker_build_context", &self.worker_build_context)
            .field("environment", &self.environment)
            .field("map_ports_to_host", &self.map_ports_to_host)
            .field("pull_images", &self.pull_images)
            .field("container_probe", &self.container_probe)
            .field("cluster_probe", &self.cluster_probe)
            .finish()
    }
}

impl ClusterConfig {
    #[must_use]
    pub fn builder() -> ClusterConfigBuilder {
        ClusterConfigBuilder::default()
    }

    #[must_use]
    pub fn runtime(&self) -> &Arc<dyn ContainerRuntime> {
        &self.runtime
    }

    #[must_use]
    pub const fn workers(&self) -> usize {
        self.workers
    }

    /// One descriptor per worker, in worker order.
    #[must_use]
    pub fn worker_resources(&self) -> &[String] {
        &self.worker_resources
    }

    #[must_use]
    pub const fn master_port(&self) -> u16 {
        self.master_port
    }

    /// Path under which cluster members register in the coordination service.
    #[must_use]
    pub fn zk_path(&self) -> &str {
        &self.zk_path
    }

    #[must_use]
    pub const fn images(&self) -> &ClusterImages {
        &self.images
    }

    /// Directory the worker image is built from instead of being pulled.
    #[must_use]
    pub fn worker_build_context(&self) -> Option<&PathBuf> {
        self.worker_build_context.as_ref()
    }

    /// Extra environment applied to every container, in key order.
    #[must_use]
    pub const fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    #[must_use]
    pub const fn map_ports_to_host(&self) -> bool {
        self.map_ports_to_host
    }

    #[must_use]
    pub const fn pull_images(&self) -> bool {
        self.pull_images
    }

    #[must_use]
    pub const fn container_probe(&self) -> ProbePolicy {
        self.container_probe
    }

    #[must_use]
    pub const fn cluster_probe(&self) -> ProbePolicy {
        self.cluster_probe
    }
}

/// Accumulates cluster options; [`ClusterConfigBuilder::build`] validates.
#[derive(Default)]
pub struct ClusterConfigBuilder {
    runtime: Option<Arc<dyn ContainerRuntime>>,
    resolver: Option<RuntimeResolver>,
    workers: Option<usize>,
    worker_resources: Vec<String>,
    master_port: Option<u16>,
    zk_path: Option<String>,
    images: ClusterImages,
    worker_build_context: Option<PathBuf>,
    environment: BTreeMap<String, String>,
    map_ports_to_host: bool,
    pull_images: Option<bool>,
    container_probe: Option<ProbePolicy>,
    cluster_probe: Option<ProbePolicy>,
}

impl ClusterConfigBuilder {
    /// Use this runtime instead of the one resolved from the environment.
    #[must_use]
    pub fn runtime(mut self, runtime: Arc<dyn ContainerRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Fallback used by [`build`](Self::build) when no runtime was given.
    #[must_use]
    pub fn runtime_resolver(mut self, resolver: RuntimeResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Number of workers. Default 3.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Resource descriptor per worker; the count must match `workers`.
    #[must_use]
    pub fn worker_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.worker_resources = resources.into_iter().map(Into::into).collect();
        self
    }

    /// Master port. Default 5050.
    #[must_use]
    pub fn master_port(mut self, port: u16) -> Self {
        self.master_port = Some(port);
        self
    }

    /// Coordination-service path. Default `mesos`.
    #[must_use]
    pub fn zk_path(mut self, path: impl Into<String>) -> Self {
        self.zk_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn coordination_image(mut self, image: ImageRef) -> Self {
        self.images.coordination = image;
        self
    }

    #[must_use]
    pub fn master_image(mut self, image: ImageRef) -> Self {
        self.images.master = image;
        self
    }

    #[must_use]
    pub fn worker_image(mut self, image: ImageRef) -> Self {
        self.images.worker = image;
        self
    }

    /// Build the worker image from `context` rather than pulling it.
    #[must_use]
    pub fn worker_build_context(mut self, context: impl Into<PathBuf>) -> Self {
        self.worker_build_context = Some(context.into());
        self
    }

    /// Add one extra environment variable; a repeated key replaces the value.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn environment(mut self, environment: BTreeMap<String, String>) -> Self {
        self.environment.extend(environment);
        self
    }

    /// Publish the master port on the host. Default off.
    #[must_use]
    pub fn map_ports_to_host(mut self, map: bool) -> Self {
        self.map_ports_to_host = map;
        self
    }

    /// Pull images before creating containers. Default on.
    #[must_use]
    pub fn pull_images(mut self, pull: bool) -> Self {
        self.pull_images = Some(pull);
        self
    }

    #[must_use]
    pub fn container_probe(mut self, policy: ProbePolicy) -> Self {
        self.container_probe = Some(policy);
        self
    }

    #[must_use]
    pub fn cluster_probe(mut self, policy: ProbePolicy) -> Self {
        self.cluster_probe = Some(policy);
        self
    }

    /// Apply defaults, validate, and resolve the runtime.
    ///
    /// Shape checks run before the runtime is resolved, so an invalid
    /// configuration never touches the container runtime.
    pub fn build(self) -> Result<ClusterConfig, ConfigError> {
        let workers = self.workers.unwrap_or(DEFAULT_WORKERS);
        let master_port = self.master_port.unwrap_or(DEFAULT_MASTER_PORT);
        let zk_path = self
            .zk_path
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ZK_PATH.to_string());

        if workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "workers",
                reason: "at least one worker is required to run a cluster".into(),
            });
        }
        if self.worker_resources.len() != workers {
            return Err(ConfigError::InvalidValue {
                field: "worker_resources",
                reason: format!(
                    "provide one resource descriptor for each worker ({} descriptors for {} workers)",
                    self.worker_resources.len(),
                    workers
                ),
            });
        }
        if master_port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "master_port",
                reason: "port must be non-zero".into(),
            });
        }
        if self.environment.keys().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "environment",
                reason: "environment variable names must not be empty".into(),
            });
        }

        let runtime = match (self.runtime, self.resolver) {
            (Some(runtime), _) => runtime,
            (None, Some(resolve)) => resolve()?,
            (None, None) => {
                return Err(ConfigError::NoRuntime {
                    reason: "no runtime supplied and no resolver configured".into(),
                })
            }
        };

        Ok(ClusterConfig {
            runtime,
            workers,
            worker_resources: self.worker_resources,
            master_port,
            zk_path,
            images: self.images,
            worker_build_context: self.worker_build_context,
            environment: self.environment,
            map_ports_to_host: self.map_ports_to_host,
            pull_images: self.pull_images.unwrap_or(true),
            container_probe: self.container_probe.unwrap_or_else(ProbePolicy::container),
            cluster_probe: self.cluster_probe.unwrap_or_else(ProbePolicy::cluster),
        })
    }
}
