//! Default container runtime resolution.

use std::sync::Arc;

use tracing::debug;

use crate::adapter::outbound::docker::DockerRuntime;
use crate::error::ConfigError;
use crate::port::runtime::ContainerRuntime;

/// Runtime from the environment: `DOCKER_HOST` or the local Docker socket.
///
/// Builds the client only; reachability is discovered by the first call.
pub fn resolve_default() -> Result<Arc<dyn ContainerRuntime>, ConfigError> {
    let runtime = DockerRuntime::connect_local().map_err(|e| ConfigError::NoRuntime {
        reason: e.to_string(),
    })?;
    debug!(runtime = runtime.name(), "Resolved container runtime");
    Ok(Arc::new(runtime))
}
