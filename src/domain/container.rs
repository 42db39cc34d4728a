//! Container descriptions handed to the runtime and the handles it returns.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::Role;

/// Label carrying the owning cluster id.
pub(crate) const LABEL_CLUSTER_ID: &str = "minicluster.cluster_id";
/// Label carrying the member role.
pub(crate) const LABEL_ROLE: &str = "minicluster.role";

/// A container port, optionally published on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortBinding {
    pub container_port: u16,
    pub host_port: Option<u16>,
}

impl PortBinding {
    /// Expose a port inside the container network only.
    #[must_use]
    pub const fn internal(container_port: u16) -> Self {
        Self {
            container_port,
            host_port: None,
        }
    }

    /// Publish the port on the same host port.
    #[must_use]
    pub const fn published(container_port: u16) -> Self {
        Self {
            container_port,
            host_port: Some(container_port),
        }
    }
}

/// Everything the runtime needs to create one cluster member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub role: Role,
    /// Full image reference (`name:tag`).
    pub image: String,
    /// Environment variables in insertion order.
    pub env: Vec<(String, String)>,
    pub ports: Vec<PortBinding>,
    pub labels: BTreeMap<String, String>,
    /// Optional command override.
    pub command: Option<Vec<String>>,
}

impl ContainerSpec {
    /// Start a spec for a member of `cluster_id`.
    pub fn new(
        cluster_id: &str,
        role: Role,
        name: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(LABEL_CLUSTER_ID.to_string(), cluster_id.to_string());
        labels.insert(LABEL_ROLE.to_string(), role.as_str().to_string());
        Self {
            name: name.into(),
            role,
            image: image.into(),
            env: Vec::new(),
            ports: Vec::new(),
            labels,
            command: None,
        }
    }

    /// Set an environment variable, replacing an earlier value for the key.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.env.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.env.push((key, value)),
        }
        self
    }

    #[must_use]
    pub fn port(mut self, binding: PortBinding) -> Self {
        self.ports.push(binding);
        self
    }

    /// Environment as `KEY=VALUE` strings, the shape runtimes expect.
    #[must_use]
    pub fn env_pairs(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// Look up an environment variable.
    #[must_use]
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A container created and tracked by this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    pub id: String,
    pub role: Role,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Last known address; `None` until inspected.
    pub ip_address: Option<String>,
}

impl Container {
    #[must_use]
    pub fn new(id: impl Into<String>, role: Role, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            name: name.into(),
            created_at: Utc::now(),
            ip_address: None,
        }
    }

    /// First 12 characters of the id, as `docker ps` shows it.
    #[must_use]
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// Truncate a runtime id for display.
#[must_use]
pub fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
