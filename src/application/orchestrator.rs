//! Cluster orchestration state machine.
//!
//! ```text
//! Absent ──create──▶ Created ──start──▶ Running ──destroy──▶ Destroyed
//! ```
//!
//! `Absent` is the absence of a persisted identity. The identity is written
//! before any container work and re-written after every member is created, so
//! a failure at any point leaves something `destroy` can clean up, from this
//! invocation or a later one.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::config::ClusterConfig;
use super::lifecycle::ContainerLifecycleManager;
use super::probe::{ProbePolicy, ReadinessProbe};
use super::shutdown::ShutdownSignal;
use super::topology;
use crate::domain::{
    short_id, ClusterIdentity, ClusterInfo, ContainerSpec, DestroyOutcome, MasterEndpoint,
    MasterState, MemberInfo, Role,
};
use crate::error::{Error, Result};
use crate::port::observer::ClusterObserver;
use crate::port::runtime::ContainerRuntime;
use crate::port::store::ClusterStore;

/// Where this orchestrator is in the cluster lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    Absent,
    Created,
    Running,
    Destroyed,
}

impl ClusterState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Created => "created",
            Self::Running => "running",
            Self::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Builds a configuration into a running cluster and tears it down again.
pub struct ClusterOrchestrator {
    lifecycle: Arc<ContainerLifecycleManager>,
    store: Arc<dyn ClusterStore>,
    observer: Arc<dyn ClusterObserver>,
    cancel: watch::Receiver<bool>,
    state: ClusterState,
    identity: Option<ClusterIdentity>,
    endpoint: Option<MasterEndpoint>,
    cluster_probe: ProbePolicy,
}

impl ClusterOrchestrator {
    /// Orchestrator over `runtime`; its lifecycle manager's cleanup hook is
    /// bound to `shutdown`.
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        store: Arc<dyn ClusterStore>,
        observer: Arc<dyn ClusterObserver>,
        shutdown: &ShutdownSignal,
    ) -> Self {
        let lifecycle = Arc::new(ContainerLifecycleManager::new(runtime, shutdown));
        Self {
            lifecycle,
            store,
            observer,
            cancel: shutdown.subscribe(),
            state: ClusterState::Absent,
            identity: None,
            endpoint: None,
            cluster_probe: ProbePolicy::cluster(),
        }
    }

    /// Orchestrator over the runtime `config` resolved.
    pub fn for_config(
        config: &ClusterConfig,
        store: Arc<dyn ClusterStore>,
        observer: Arc<dyn ClusterObserver>,
        shutdown: &ShutdownSignal,
    ) -> Self {
        Self::new(config.runtime().clone(), store, observer, shutdown)
    }

    /// Where this orchestrator is in the create/start/destroy sequence.
    #[must_use]
    pub const fn state(&self) -> ClusterState {
        self.state
    }

    /// Identity of the cluster this orchestrator created, if any.
    #[must_use]
    pub const fn identity(&self) -> Option<&ClusterIdentity> {
        self.identity.as_ref()
    }

    /// Address the observer polls, known once the master is up.
    #[must_use]
    pub const fn master_endpoint(&self) -> Option<&MasterEndpoint> {
        self.endpoint.as_ref()
    }

    /// The manager that owns this cluster's containers.
    #[must_use]
    pub fn lifecycle(&self) -> &Arc<ContainerLifecycleManager> {
        &self.lifecycle
    }

    /// The persisted identity, if a cluster is active.
    pub fn active_cluster(&self) -> Result<Option<ClusterIdentity>> {
        self.store.load()
    }

    /// Whether the state store records a cluster.
    pub fn is_active(&self) -> Result<bool> {
        Ok(self.active_cluster()?.is_some())
    }

    /// Create and probe every member in dependency order: coordination,
    /// master, then workers.
    pub async fn create(&mut self, config: &ClusterConfig) -> Result<&ClusterIdentity> {
        if let Some(existing) = self.store.load()? {
            return Err(Error::AlreadyActive {
                cluster_id: existing.cluster_id,
            });
        }
        if !matches!(self.state, ClusterState::Absent | ClusterState::Destroyed) {
            return Err(Error::InvalidState {
                operation: "create",
                state: self.state.to_string(),
            });
        }

        self.lifecycle.set_probe_policy(config.container_probe());
        self.cluster_probe = config.cluster_probe();

        let identity = ClusterIdentity::generate();
        let cluster_id = identity.cluster_id.clone();
        self.store.save(&identity)?;
        self.identity = Some(identity);
        info!(
            cluster_id = %cluster_id,
            workers = config.workers(),
            runtime = self.lifecycle.runtime().name(),
            "Creating cluster"
        );

        self.prepare_image(config, Role::Coordination).await?;
        let coordination = self
            .add_member(topology::coordination_spec(config, &cluster_id))
            .await?;
        let coordination_ip = self.lifecycle.inspect_ip(&coordination).await?;

        self.prepare_image(config, Role::Master).await?;
        let master = self
            .add_member(topology::master_spec(config, &cluster_id, &coordination_ip))
            .await?;
        let master_ip = self.lifecycle.inspect_ip(&master).await?;

        let endpoint = if config.map_ports_to_host() {
            MasterEndpoint::new("localhost", config.master_port())
        } else {
            MasterEndpoint::new(master_ip.clone(), config.master_port())
        };
        self.record_master_url(&endpoint)?;
        self.endpoint = Some(endpoint);

        self.prepare_image(config, Role::Worker).await?;
        for index in 0..config.workers() {
            self.add_member(topology::worker_spec(config, &cluster_id, index, &master_ip))
                .await?;
        }

        self.state = ClusterState::Created;
        info!(cluster_id = %cluster_id, members = config.workers() + 2, "Cluster created");
        self.identity.as_ref().ok_or_else(|| Error::InvalidState {
            operation: "create",
            state: self.state.to_string(),
        })
    }

    /// Start every member that is not running. No-op once running.
    pub async fn start(&mut self) -> Result<()> {
        match self.state {
            ClusterState::Running => return Ok(()),
            ClusterState::Created => {}
            other => {
                return Err(Error::InvalidState {
                    operation: "start",
                    state: other.to_string(),
                })
            }
        }

        let members = self
            .identity
            .as_ref()
            .map(|identity| identity.members.clone())
            .unwrap_or_default();
        let runtime = self.lifecycle.runtime().clone();
        for member in &members {
            let inspection = runtime.inspect_container(&member.container_id).await?;
            if !inspection.status.is_running() {
                info!(role = %member.role, container = %short_id(&member.container_id), "Starting member");
                self.lifecycle.start_and_probe(&member.container_id).await?;
            }
        }

        self.state = ClusterState::Running;
        Ok(())
    }

    /// Poll the master's state document until `predicate` holds.
    ///
    /// Observer failures count as "not yet". Fails with [`Error::Timeout`]
    /// under the cluster readiness policy and [`Error::Cancelled`] on
    /// shutdown.
    pub async fn wait_for_state<P>(&self, predicate: P) -> Result<MasterState>
    where
        P: Fn(&MasterState) -> bool,
    {
        let endpoint = self.endpoint.as_ref().ok_or_else(|| Error::InvalidState {
            operation: "wait for master state",
            state: self.state.to_string(),
        })?;

        let probe = ReadinessProbe::new(format!("master state at {endpoint}"), self.cluster_probe)
            .with_cancel(self.cancel.clone());
        let matched: Mutex<Option<MasterState>> = Mutex::new(None);
        let observer = &self.observer;
        let predicate = &predicate;
        let slot = &matched;

        let outcome = probe
            .until(move || async move {
                match observer.master_state(endpoint).await {
                    Ok(state) if predicate(&state) => {
                        *slot.lock() = Some(state);
                        true
                    }
                    Ok(_) => false,
                    Err(e) => {
                        debug!(endpoint = %endpoint, error = %e, "Master state not available yet");
                        false
                    }
                }
            })
            .await?;

        info!(endpoint = %endpoint, attempts = outcome.attempts, "Master state condition met");
        matched.into_inner().ok_or_else(|| Error::Timeout {
            condition: format!("master state at {endpoint}"),
            elapsed: outcome.elapsed,
            attempts: outcome.attempts,
        })
    }

    /// Remove every member of the persisted cluster and forget it.
    pub async fn destroy(&mut self) -> Result<DestroyOutcome> {
        let Some(identity) = self.store.load()? else {
            debug!("No cluster identity found");
            return Ok(DestroyOutcome::NotRunning);
        };
        info!(
            cluster_id = %identity.cluster_id,
            members = identity.members.len(),
            "Destroying cluster"
        );

        // Workers first, coordination last. Anything created but never
        // recorded is removed as well.
        let mut ids: Vec<String> = identity.container_ids().into_iter().rev().collect();
        for container in self.lifecycle.tracked().into_iter().rev() {
            if !ids.contains(&container.id) {
                ids.push(container.id);
            }
        }

        let report = self.lifecycle.remove(&ids).await;
        if !report.is_clean() {
            warn!(
                cluster_id = %identity.cluster_id,
                failed = report.failed.len(),
                "Some cluster members could not be removed"
            );
        }
        self.store.clear()?;

        self.state = ClusterState::Destroyed;
        self.identity = None;
        self.endpoint = None;
        info!(cluster_id = %identity.cluster_id, removed = report.removed.len(), "Cluster destroyed");

        Ok(DestroyOutcome::Destroyed {
            cluster_id: identity.cluster_id,
            removed: report.removed,
            failed: report.failed,
        })
    }

    /// Live view of the persisted cluster, `None` when none is active.
    pub async fn info(&self) -> Result<Option<ClusterInfo>> {
        let Some(identity) = self.store.load()? else {
            return Ok(None);
        };

        let runtime = self.lifecycle.runtime();
        let mut members = Vec::with_capacity(identity.members.len());
        for member in identity.members {
            let (ip_address, running) = match runtime.inspect_container(&member.container_id).await {
                Ok(inspection) => (inspection.ip_address, inspection.status.is_running()),
                Err(e) if e.is_not_found() => (None, false),
                Err(e) => return Err(e),
            };
            members.push(MemberInfo {
                role: member.role,
                container_id: member.container_id,
                name: member.name,
                ip_address,
                running,
            });
        }

        Ok(Some(ClusterInfo {
            cluster_id: identity.cluster_id,
            created_at: identity.created_at,
            master_url: identity.master_url,
            members,
        }))
    }

    async fn prepare_image(&self, config: &ClusterConfig, role: Role) -> Result<()> {
        let images = config.images();
        let image = match role {
            Role::Coordination => &images.coordination,
            Role::Master => &images.master,
            Role::Worker => &images.worker,
        };

        if role == Role::Worker {
            if let Some(context) = config.worker_build_context() {
                return self.lifecycle.build_image(context, &image.to_string()).await;
            }
        }
        if config.pull_images() {
            self.lifecycle.pull_image(&image.name, &image.tag).await?;
        }
        Ok(())
    }

    /// Create a member, record it, then start and probe it.
    async fn add_member(&mut self, spec: ContainerSpec) -> Result<String> {
        let id = self.lifecycle.create(&spec).await?;

        let identity = self.identity.as_mut().ok_or_else(|| Error::InvalidState {
            operation: "record member",
            state: self.state.to_string(),
        })?;
        identity.push(spec.role, id.clone(), spec.name.clone());
        self.store.save(identity)?;

        self.lifecycle.start_and_probe(&id).await?;
        info!(role = %spec.role, name = %spec.name, container = %short_id(&id), "Member ready");
        Ok(id)
    }

    fn record_master_url(&mut self, endpoint: &MasterEndpoint) -> Result<()> {
        if let Some(identity) = self.identity.as_mut() {
            identity.master_url = Some(endpoint.base_url());
            self.store.save(identity)?;
        }
        Ok(())
    }
}
