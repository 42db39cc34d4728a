//! Persisted identity of a cluster.
//!
//! The identity is the only state that survives between invocations: it lets
//! `destroy` and `info` find the containers an earlier `up` created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Role;

/// Current identity document format version.
pub const IDENTITY_VERSION: &str = "1";

/// One container belonging to a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub role: Role,
    pub container_id: String,
    pub name: String,
}

/// Cluster id plus its members in creation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterIdentity {
    /// Schema version for forward compatibility.
    pub version: String,
    pub cluster_id: String,
    pub created_at: DateTime<Utc>,
    /// Where the master's state document is served, once known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_url: Option<String>,
    #[serde(default)]
    pub members: Vec<ClusterMember>,
}

impl ClusterIdentity {
    /// Create an identity with a freshly generated id and no members.
    #[must_use]
    pub fn generate() -> Self {
        Self::with_id(generate_cluster_id())
    }

    #[must_use]
    pub fn with_id(cluster_id: impl Into<String>) -> Self {
        Self {
            version: IDENTITY_VERSION.to_string(),
            cluster_id: cluster_id.into(),
            created_at: Utc::now(),
            master_url: None,
            members: Vec::new(),
        }
    }

    pub fn push(&mut self, role: Role, container_id: impl Into<String>, name: impl Into<String>) {
        self.members.push(ClusterMember {
            role,
            container_id: container_id.into(),
            name: name.into(),
        });
    }

    /// First member with the given role.
    #[must_use]
    pub fn member(&self, role: Role) -> Option<&ClusterMember> {
        self.members.iter().find(|m| m.role == role)
    }

    pub fn members_with(&self, role: Role) -> impl Iterator<Item = &ClusterMember> {
        self.members.iter().filter(move |m| m.role == role)
    }

    #[must_use]
    pub fn container_ids(&self) -> Vec<String> {
        self.members.iter().map(|m| m.container_id.clone()).collect()
    }
}

/// Eight hex characters taken from a v4 UUID.
fn generate_cluster_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_short_and_distinct() {
        let a = ClusterIdentity::generate();
        let b = ClusterIdentity::generate();
        assert_eq!(a.cluster_id.len(), 8);
        assert!(a.cluster_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a.cluster_id, b.cluster_id);
        assert!(a.members.is_empty());
    }

    #[test]
    fn members_keep_creation_order() {
        let mut identity = ClusterIdentity::with_id("deadbeef");
        identity.push(Role::Coordination, "zk", "mc-zk");
        identity.push(Role::Master, "m", "mc-master");
        identity.push(Role::Worker, "w0", "mc-worker-0");
        identity.push(Role::Worker, "w1", "mc-worker-1");

        assert_eq!(identity.container_ids(), vec!["zk", "m", "w0", "w1"]);
        assert_eq!(identity.member(Role::Master).unwrap().container_id, "m");
        assert_eq!(identity.members_with(Role::Worker).count(), 2);
    }

    #[test]
    fn identity_without_members_field_decodes() {
        let json = r#"{
            "version": "1",
            "cluster_id": "0badf00d",
            "created_at": "2024-01-15T10:30:00Z"
        }"#;
        let identity: ClusterIdentity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.cluster_id, "0badf00d");
        assert!(identity.members.is_empty());
    }
}
