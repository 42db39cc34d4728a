//! Operator implementation wiring the orchestration core to real adapters.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use super::config::settings::Settings;
use super::runtime;
use crate::adapter::outbound::http::MasterStateClient;
use crate::adapter::outbound::store::ClusterStateStore;
use crate::application::config::ClusterConfig;
use crate::application::orchestrator::ClusterOrchestrator;
use crate::application::shutdown::{ShutdownReason, ShutdownSignal};
use crate::domain::{ClusterInfo, DestroyOutcome, MasterState};
use crate::error::{ConfigError, Error, Result};
use crate::port::inbound::operator::{
    ClusterOperator, DestroyRequest, InfoRequest, UpOutcome, UpRequest,
};
use crate::port::observer::ClusterObserver;
use crate::port::runtime::ContainerRuntime;
use crate::port::store::ClusterStore;

/// Runs cluster commands against the configured runtime and observer.
pub struct Operator {
    shutdown: ShutdownSignal,
    observer: Arc<dyn ClusterObserver>,
    runtime: Option<Arc<dyn ContainerRuntime>>,
}

impl Operator {
    /// Operator over the environment's Docker daemon and the HTTP master
    /// client.
    pub fn new(shutdown: ShutdownSignal) -> Self {
        Self {
            shutdown,
            observer: Arc::new(MasterStateClient::new()),
            runtime: None,
        }
    }

    /// Use `runtime` instead of resolving one from the environment.
    #[must_use]
    pub fn with_runtime(mut self, runtime: Arc<dyn ContainerRuntime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ClusterObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub const fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    fn runtime(&self) -> std::result::Result<Arc<dyn ContainerRuntime>, ConfigError> {
        match &self.runtime {
            Some(runtime) => Ok(runtime.clone()),
            None => runtime::resolve_default(),
        }
    }

    fn orchestrator(&self, store: Arc<dyn ClusterStore>) -> Result<ClusterOrchestrator> {
        Ok(ClusterOrchestrator::new(
            self.runtime()?,
            store,
            self.observer.clone(),
            &self.shutdown,
        ))
    }

    fn cluster_config(&self, request: &UpRequest) -> Result<(ClusterConfig, Option<std::path::PathBuf>)> {
        let (mut settings, source) = Settings::resolve(request.config_path.as_deref())?;
        settings = settings.with_map_ports_to_host(request.map_ports_to_host);
        if let Some(workers) = request.workers {
            settings = settings.with_workers(workers);
        }

        let mut builder = settings.into_builder()?;
        if let Some(runtime) = &self.runtime {
            builder = builder.runtime(runtime.clone());
        }
        Ok((builder.build()?, source))
    }

    /// The error reported when the shutdown signal ends a command early.
    fn interrupted(&self, deadline: Option<Duration>) -> Error {
        match (self.shutdown.reason(), deadline) {
            (Some(ShutdownReason::Deadline), Some(deadline)) => Error::Timeout {
                condition: "cluster to come up".into(),
                elapsed: deadline,
                attempts: 1,
            },
            _ => Error::Cancelled,
        }
    }
}

async fn bring_up(orchestrator: &mut ClusterOrchestrator, config: &ClusterConfig) -> Result<ClusterInfo> {
    orchestrator.create(config).await?;
    orchestrator.start().await?;
    orchestrator.wait_for_state(MasterState::has_leader).await?;
    orchestrator.info().await?.ok_or_else(|| Error::InvalidState {
        operation: "report cluster",
        state: orchestrator.state().to_string(),
    })
}

#[async_trait]
impl ClusterOperator for Operator {
    async fn up(&self, request: UpRequest) -> Result<UpOutcome> {
        let store = Arc::new(ClusterStateStore::new(&request.state_dir));
        if let Some(existing) = store.load()? {
            return Ok(UpOutcome::AlreadyRunning {
                cluster_id: existing.cluster_id,
            });
        }

        let (config, config_source) = self.cluster_config(&request)?;
        if let Some(deadline) = request.deadline {
            self.shutdown.arm_deadline(deadline);
        }

        let mut orchestrator = ClusterOrchestrator::for_config(
            &config,
            store,
            self.observer.clone(),
            &self.shutdown,
        );
        let result = tokio::select! {
            result = bring_up(&mut orchestrator, &config) => result,
            () = self.shutdown.triggered() => Err(Error::Cancelled),
        }
        .map_err(|e| match e {
            Error::Cancelled => self.interrupted(request.deadline),
            other => other,
        });

        match result {
            Ok(info) => {
                orchestrator.lifecycle().detach();
                info!(cluster_id = %info.cluster_id, "Cluster is up");
                Ok(UpOutcome::Started {
                    info,
                    config_source,
                })
            }
            Err(e) => {
                warn!(error = %e, "Bringing the cluster up failed; rolling back");
                if let Err(rollback) = orchestrator.destroy().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                if let Some(report) = orchestrator.lifecycle().release().await {
                    if !report.is_clean() {
                        warn!(failed = report.failed.len(), "Containers left after rollback");
                    }
                }
                Err(e)
            }
        }
    }

    async fn destroy(&self, request: DestroyRequest) -> Result<DestroyOutcome> {
        let store = Arc::new(ClusterStateStore::new(&request.state_dir));
        if store.load()?.is_none() {
            return Ok(DestroyOutcome::NotRunning);
        }
        self.orchestrator(store)?.destroy().await
    }

    async fn info(&self, request: InfoRequest) -> Result<Option<ClusterInfo>> {
        let store = Arc::new(ClusterStateStore::new(&request.state_dir));
        if store.load()?.is_none() {
            return Ok(None);
        }
        self.orchestrator(store)?.info().await
    }
}
