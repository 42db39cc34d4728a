//! Cluster settings file loading.
//!
//! Settings come from a TOML file with four sections:
//!
//! ```toml
//! [cluster]
//! workers = 2
//! worker_resources = ["cpus(*):1", "cpus(*):2"]
//! master_port = 5050
//! zk_path = "mesos"
//! map_ports_to_host = false
//! pull_images = true
//! environment = { LIBPROCESS_IP = "0.0.0.0" }
//!
//! [images]
//! coordination = "jplock/zookeeper:3.4.6"
//! master = "mesosphere/mesos-master:0.22.1-1.0.ubuntu1404"
//! worker = "mesosphere/mesos-slave:0.22.1-1.0.ubuntu1404"
//!
//! [readiness]
//! container_timeout_secs = 10
//! cluster_timeout_secs = 60
//!
//! [logging]
//! level = "info"
//! format = "pretty"
//! ```
//!
//! Every key is optional. The file is looked up in order: an explicit path,
//! `./minicluster.toml`, `~/.minicluster/config.toml`; with none present the
//! defaults apply.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::logging::LoggingConfig;
use crate::application::config::{
    ClusterConfig, ClusterConfigBuilder, ImageRef, DEFAULT_MASTER_PORT, DEFAULT_WORKERS,
    DEFAULT_WORKER_RESOURCES, DEFAULT_ZK_PATH,
};
use crate::application::probe::ProbePolicy;
use crate::error::ConfigError;
use crate::infrastructure::runtime;

/// Settings file in the working directory.
pub const LOCAL_SETTINGS_FILE: &str = "minicluster.toml";

/// `[cluster]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClusterSection {
    pub workers: usize,
    /// One descriptor per worker; omitted means one default per worker.
    pub worker_resources: Option<Vec<String>>,
    pub master_port: u16,
    pub zk_path: String,
    pub map_ports_to_host: bool,
    pub pull_images: bool,
    pub environment: BTreeMap<String, String>,
    /// Build the worker image from this directory instead of pulling it.
    pub worker_build_context: Option<PathBuf>,
}

impl Default for ClusterSection {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            worker_resources: None,
            master_port: DEFAULT_MASTER_PORT,
            zk_path: DEFAULT_ZK_PATH.to_string(),
            map_ports_to_host: false,
            pull_images: true,
            environment: BTreeMap::new(),
            worker_build_context: None,
        }
    }
}

/// `[images]` section, each entry `name:tag`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImagesSection {
    pub coordination: String,
    pub master: String,
    pub worker: String,
}

impl Default for ImagesSection {
    fn default() -> Self {
        let images = crate::application::config::ClusterImages::default();
        Self {
            coordination: images.coordination.to_string(),
            master: images.master.to_string(),
            worker: images.worker.to_string(),
        }
    }
}

/// `[readiness]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReadinessSection {
    pub container_timeout_secs: u64,
    pub container_poll_secs: u64,
    pub cluster_timeout_secs: u64,
    pub cluster_poll_secs: u64,
}

impl Default for ReadinessSection {
    fn default() -> Self {
        let container = ProbePolicy::container();
        let cluster = ProbePolicy::cluster();
        Self {
            container_timeout_secs: container.timeout.as_secs(),
            container_poll_secs: container.poll_interval.as_secs(),
            cluster_timeout_secs: cluster.timeout.as_secs(),
            cluster_poll_secs: cluster.poll_interval.as_secs(),
        }
    }
}

impl ReadinessSection {
    fn policy(
        timeout_secs: u64,
        poll_secs: u64,
        field: &'static str,
    ) -> Result<ProbePolicy, ConfigError> {
        if poll_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field,
                reason: "poll interval must be at least one second".into(),
            });
        }
        Ok(ProbePolicy::new(
            Duration::from_secs(timeout_secs),
            Duration::from_secs(poll_secs),
        ))
    }

    pub fn container(&self) -> Result<ProbePolicy, ConfigError> {
        Self::policy(
            self.container_timeout_secs,
            self.container_poll_secs,
            "container_poll_secs",
        )
    }

    pub fn cluster(&self) -> Result<ProbePolicy, ConfigError> {
        Self::policy(
            self.cluster_timeout_secs,
            self.cluster_poll_secs,
            "cluster_poll_secs",
        )
    }
}

/// Everything a settings file can say.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub cluster: ClusterSection,
    pub images: ImagesSection,
    pub readiness: ReadinessSection,
    pub logging: LoggingConfig,
}

impl Settings {
    /// Parse settings text; `origin` names the source in errors.
    pub fn parse_toml(content: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_toml(&content, path)
    }

    /// Candidate files, most specific first, when no path is given.
    #[must_use]
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_SETTINGS_FILE)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".minicluster").join("config.toml"));
        }
        paths
    }

    /// Load the explicit file (which must exist), else the first candidate
    /// that exists, else defaults. Returns the file used, if any.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        Self::resolve_from(&Self::search_paths())
    }

    /// [`resolve`](Self::resolve) over an explicit candidate list.
    pub fn resolve_from(candidates: &[PathBuf]) -> Result<(Self, Option<PathBuf>), ConfigError> {
        for candidate in candidates {
            if candidate.is_file() {
                debug!(path = %candidate.display(), "Loading settings");
                return Ok((Self::load(candidate)?, Some(candidate.clone())));
            }
        }
        Ok((Self::default(), None))
    }

    /// Override the worker count. Defaulted descriptors follow the new count;
    /// explicit ones are left for validation to compare.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.cluster.workers = workers;
        self
    }

    #[must_use]
    pub fn with_map_ports_to_host(mut self, map: bool) -> Self {
        self.cluster.map_ports_to_host |= map;
        self
    }

    /// Descriptors to hand the builder, filling defaults when none are set.
    #[must_use]
    pub fn worker_resources(&self) -> Vec<String> {
        self.cluster.worker_resources.clone().unwrap_or_else(|| {
            vec![DEFAULT_WORKER_RESOURCES.to_string(); self.cluster.workers]
        })
    }

    /// Builder carrying these settings and the environment's runtime
    /// resolver.
    pub fn into_builder(self) -> Result<ClusterConfigBuilder, ConfigError> {
        let resources = self.worker_resources();
        let mut builder = ClusterConfig::builder()
            .runtime_resolver(runtime::resolve_default)
            .workers(self.cluster.workers)
            .worker_resources(resources)
            .master_port(self.cluster.master_port)
            .zk_path(self.cluster.zk_path)
            .coordination_image(ImageRef::parse(&self.images.coordination)?)
            .master_image(ImageRef::parse(&self.images.master)?)
            .worker_image(ImageRef::parse(&self.images.worker)?)
            .environment(self.cluster.environment)
            .map_ports_to_host(self.cluster.map_ports_to_host)
            .pull_images(self.cluster.pull_images)
            .container_probe(self.readiness.container()?)
            .cluster_probe(self.readiness.cluster()?);
        if let Some(context) = self.cluster.worker_build_context {
            builder = builder.worker_build_context(context);
        }
        Ok(builder)
    }
}
