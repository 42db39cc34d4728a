//! Operator capability surface consumed by the CLI.
//!
//! Request and response types for the three cluster commands. The CLI builds
//! requests from its flags, calls the operator, and renders what comes back.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{ClusterInfo, DestroyOutcome};
use crate::error::Result;

/// Bring a cluster up.
#[derive(Debug, Clone, Default)]
pub struct UpRequest {
    /// Directory holding the cluster identity.
    pub state_dir: PathBuf,
    /// Settings file that must exist; `None` searches the default locations.
    pub config_path: Option<PathBuf>,
    /// Override for the worker count.
    pub workers: Option<usize>,
    /// Publish the master port on the host.
    pub map_ports_to_host: bool,
    /// Overall deadline for the whole command.
    pub deadline: Option<Duration>,
}

/// What `up` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpOutcome {
    /// A new cluster is running and detached from this process.
    Started {
        info: ClusterInfo,
        /// Settings file used, if any.
        config_source: Option<PathBuf>,
    },
    /// A cluster was already recorded in the state directory.
    AlreadyRunning { cluster_id: String },
}

/// Destroy the recorded cluster.
#[derive(Debug, Clone, Default)]
pub struct DestroyRequest {
    pub state_dir: PathBuf,
}

/// Describe the recorded cluster.
#[derive(Debug, Clone, Default)]
pub struct InfoRequest {
    pub state_dir: PathBuf,
}

/// Cluster operations available to inbound adapters.
#[async_trait]
pub trait ClusterOperator: Send + Sync {
    /// Create, start and wait for a cluster. On failure everything created is
    /// removed again before the error is returned.
    async fn up(&self, request: UpRequest) -> Result<UpOutcome>;

    /// Remove the recorded cluster, if any.
    async fn destroy(&self, request: DestroyRequest) -> Result<DestroyOutcome>;

    /// The recorded cluster with live member status, if any.
    async fn info(&self, request: InfoRequest) -> Result<Option<ClusterInfo>>;
}
