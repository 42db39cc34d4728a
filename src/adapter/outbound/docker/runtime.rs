//! Docker implementation of the container runtime port.
//!
//! Talks to the daemon over its HTTP API with bollard. Pull and build
//! progress is forwarded line by line through a channel so the returned
//! [`LogStream`] owns nothing borrowed from the client.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogOutput, RemoveContainerOptions,
    StartContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::image::{BuildImageOptions, CreateImageOptions};
use bollard::service::{HostConfig, PortBinding as DockerPortBinding};
use bollard::Docker;
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::domain::{short_id, ContainerSpec};
use crate::error::{Error, Result};
use crate::port::runtime::{
    ContainerInspection, ContainerRuntime, ContainerStatus, ExecOutput, LogStream,
};

const LOG_CHANNEL_CAPACITY: usize = 64;

/// Container runtime backed by the local Docker daemon.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Client for `DOCKER_HOST` or the platform's default socket.
    ///
    /// Only builds the client; nothing is sent to the daemon until the first
    /// call.
    pub fn connect_local() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::runtime("connect to docker", e))?;
        Ok(Self { docker })
    }

    #[must_use]
    pub const fn from_client(docker: Docker) -> Self {
        Self { docker }
    }
}

/// Map a daemon error, turning 404 into [`Error::NotFound`] and a 409 for a
/// removal someone else started into [`Error::RemovalInProgress`].
fn classify(operation: &'static str, subject: &str, err: DockerError) -> Error {
    match err {
        DockerError::DockerResponseServerError {
            status_code: 404, ..
        } => Error::NotFound(subject.to_string()),
        DockerError::DockerResponseServerError {
            status_code: 409,
            ref message,
        } if is_removal_in_progress(message) => Error::RemovalInProgress(subject.to_string()),
        other => Error::runtime(operation, other),
    }
}

/// The daemon's conflict reply when two callers remove the same container.
fn is_removal_in_progress(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("removal of container") && message.contains("already in progress")
}

/// Translate a spec into bollard's create request.
fn container_config(spec: &ContainerSpec) -> Config<String> {
    let exposed_ports: HashMap<String, HashMap<(), ()>> = spec
        .ports
        .iter()
        .map(|p| (format!("{}/tcp", p.container_port), HashMap::new()))
        .collect();

    let port_bindings: HashMap<String, Option<Vec<DockerPortBinding>>> = spec
        .ports
        .iter()
        .filter_map(|p| {
            p.host_port.map(|host_port| {
                let binding = DockerPortBinding {
                    host_ip: None,
                    host_port: Some(host_port.to_string()),
                };
                (format!("{}/tcp", p.container_port), Some(vec![binding]))
            })
        })
        .collect();

    let host_config = HostConfig {
        port_bindings: (!port_bindings.is_empty()).then_some(port_bindings),
        ..Default::default()
    };

    Config {
        image: Some(spec.image.clone()),
        hostname: Some(spec.name.clone()),
        env: Some(spec.env_pairs()),
        labels: Some(spec.labels.clone().into_iter().collect()),
        exposed_ports: Some(exposed_ports),
        host_config: Some(host_config),
        cmd: spec.command.clone(),
        ..Default::default()
    }
}

fn status_of(state: Option<&bollard::service::ContainerState>) -> ContainerStatus {
    use bollard::service::ContainerStateStatusEnum as S;

    let Some(state) = state else {
        return ContainerStatus::Other;
    };
    if state.running == Some(true) {
        return ContainerStatus::Running;
    }
    match state.status {
        Some(S::CREATED) => ContainerStatus::Created,
        Some(S::RUNNING) => ContainerStatus::Running,
        Some(S::EXITED | S::DEAD) => ContainerStatus::Exited,
        _ => ContainerStatus::Other,
    }
}

/// Tar a build context directory in memory.
fn tar_context(dir: &Path) -> std::io::Result<Bytes> {
    let mut archive = tar::Builder::new(Vec::new());
    archive.append_dir_all(".", dir)?;
    Ok(Bytes::from(archive.into_inner()?))
}

/// Stream fed by a background task through a bounded channel.
fn channel_stream(rx: mpsc::Receiver<Result<String>>) -> LogStream {
    Box::pin(stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };
        let response = self
            .docker
            .create_container(Some(options), container_config(spec))
            .await
            .map_err(|e| Error::runtime("create container", e))?;

        for warning in &response.warnings {
            warn!(container = %spec.name, warning = %warning, "Docker warning");
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<()> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| classify("start container", &format!("container {id}"), e))
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspection> {
        let response = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(|e| classify("inspect container", &format!("container {id}"), e))?;

        let ip_address = response.network_settings.and_then(|settings| {
            settings
                .ip_address
                .filter(|ip| !ip.is_empty())
                .or_else(|| {
                    settings.networks.and_then(|networks| {
                        networks
                            .into_values()
                            .filter_map(|endpoint| endpoint.ip_address)
                            .find(|ip| !ip.is_empty())
                    })
                })
        });

        Ok(ContainerInspection {
            id: response.id.unwrap_or_else(|| id.to_string()),
            status: status_of(response.state.as_ref()),
            ip_address,
        })
    }

    async fn exec(&self, id: &str, cmd: &[String]) -> Result<ExecOutput> {
        let options = CreateExecOptions {
            cmd: Some(cmd.to_vec()),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            ..Default::default()
        };
        let exec = self
            .docker
            .create_exec(id, options)
            .await
            .map_err(|e| classify("create exec", &format!("container {id}"), e))?;

        let mut stdout = String::new();
        let mut stderr = String::new();
        let started = self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| Error::runtime("start exec", e))?;
        if let StartExecResults::Attached { mut output, .. } = started {
            while let Some(chunk) = output.next().await {
                match chunk.map_err(|e| Error::runtime("read exec output", e))? {
                    LogOutput::StdOut { message } => {
                        stdout.push_str(&String::from_utf8_lossy(&message));
                    }
                    LogOutput::StdErr { message } => {
                        stderr.push_str(&String::from_utf8_lossy(&message));
                    }
                    _ => {}
                }
            }
        }

        let inspected = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| Error::runtime("inspect exec", e))?;
        debug!(container = %short_id(id), exit_code = ?inspected.exit_code, "Exec finished");

        Ok(ExecOutput {
            stdout,
            stderr,
            exit_code: inspected.exit_code.unwrap_or(-1),
        })
    }

    async fn pull_image(&self, name: &str, tag: &str) -> Result<LogStream> {
        let options = CreateImageOptions {
            from_image: name.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };
        let docker = self.docker.clone();
        let (tx, rx) = mpsc::channel(LOG_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut progress = docker.create_image(Some(options), None, None);
            while let Some(item) = progress.next().await {
                let line = match item {
                    Ok(info) => match (info.error, info.status) {
                        (Some(error), _) => Err(Error::runtime("pull image", error)),
                        (None, Some(status)) => Ok(match info.id {
                            Some(layer) => format!("{layer}: {status}"),
                            None => status,
                        }),
                        (None, None) => continue,
                    },
                    Err(e) => Err(Error::runtime("pull image", e)),
                };
                let failed = line.is_err();
                if tx.send(line).await.is_err() || failed {
                    break;
                }
            }
        });

        Ok(channel_stream(rx))
    }

    async fn build_image(&self, context: &Path, tag: &str) -> Result<LogStream> {
        let dir: PathBuf = context.to_path_buf();
        let archive = tokio::task::spawn_blocking(move || tar_context(&dir))
            .await
            .map_err(|e| Error::runtime("archive build context", e))?
            .map_err(|e| Error::runtime("archive build context", e))?;

        let options = BuildImageOptions {
            t: tag.to_string(),
            rm: true,
            ..Default::default()
        };
        let docker = self.docker.clone();
        let (tx, rx) = mpsc::channel(LOG_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            let mut progress = docker.build_image(options, None, Some(archive));
            while let Some(item) = progress.next().await {
                let line = match item {
                    Ok(info) => match (info.error, info.stream) {
                        (Some(error), _) => Err(Error::runtime("build image", error)),
                        (None, Some(text)) => {
                            let text = text.trim_end().to_string();
                            if text.is_empty() {
                                continue;
                            }
                            Ok(text)
                        }
                        (None, None) => continue,
                    },
                    Err(e) => Err(Error::runtime("build image", e)),
                };
                let failed = line.is_err();
                if tx.send(line).await.is_err() || failed {
                    break;
                }
            }
        });

        Ok(channel_stream(rx))
    }

    async fn remove_container(&self, id: &str) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            v: true,
            ..Default::default()
        };
        match self.docker.remove_container(id, Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) => match classify("remove container", &format!("container {id}"), e) {
                Error::NotFound(_) => {
                    debug!(container = %short_id(id), "Container already gone");
                    Ok(())
                }
                Error::RemovalInProgress(_) => {
                    debug!(container = %short_id(id), "Container removal already underway");
                    Ok(())
                }
                other => Err(other),
            },
        }
    }

    fn name(&self) -> &'static str {
        "docker"
    }
}
