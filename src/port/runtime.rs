//! Container runtime port.
//!
//! The minimum surface the lifecycle manager needs from a container runtime.
//! Implementations translate runtime-specific failures into [`Error`]:
//! a container that no longer exists is [`Error::NotFound`], a container some
//! other caller is already removing is [`Error::RemovalInProgress`], anything
//! else the runtime rejects is [`Error::Runtime`].

use std::path::Path;

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::domain::ContainerSpec;
use crate::error::{Error, Result};

/// Line-oriented output of a pull or build, consumed to completion.
pub type LogStream = BoxStream<'static, Result<String>>;

/// Coarse runtime status of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    Running,
    Exited,
    Other,
}

impl ContainerStatus {
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// What inspecting a container reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInspection {
    pub id: String,
    pub status: ContainerStatus,
    /// Primary network address, `None` while unassigned.
    pub ip_address: Option<String>,
}

/// Result of a short-lived command run inside a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i64,
}

impl ExecOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runtime capable of hosting cluster containers.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Create a container from `spec`, returning the runtime-assigned id.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    /// Start a created container.
    async fn start_container(&self, id: &str) -> Result<()>;

    /// Inspect a container. Fails with [`Error::NotFound`] when it is gone.
    async fn inspect_container(&self, id: &str) -> Result<ContainerInspection>;

    /// Run `cmd` inside a running container and collect its output.
    async fn exec(&self, id: &str, cmd: &[String]) -> Result<ExecOutput>;

    /// Pull `name:tag`, streaming progress lines.
    async fn pull_image(&self, name: &str, tag: &str) -> Result<LogStream>;

    /// Build the directory `context` into an image tagged `tag`.
    async fn build_image(&self, context: &Path, tag: &str) -> Result<LogStream>;

    /// Force-remove a container. A container that is already gone is success.
    async fn remove_container(&self, id: &str) -> Result<()>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Collapse "already gone" into success for removal paths.
pub(crate) fn tolerate_missing(result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_gone() => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_container_removal_is_success() {
        assert!(tolerate_missing(Err(Error::NotFound("abc".into()))).is_ok());
        assert!(tolerate_missing(Err(Error::RemovalInProgress("abc".into()))).is_ok());
        assert!(tolerate_missing(Err(Error::Cancelled)).is_err());
        assert!(tolerate_missing(Ok(())).is_ok());
    }

    #[test]
    fn exec_success_is_zero_exit() {
        let ok = ExecOutput {
            exit_code: 0,
            ..Default::default()
        };
        let failed = ExecOutput {
            exit_code: 127,
            ..Default::default()
        };
        assert!(ok.success());
        assert!(!failed.success());
    }
}
