//! What cluster-level operations report back to callers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Role;

/// Result of destroying whatever cluster the state directory points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DestroyOutcome {
    /// A cluster existed; its members were removed and its identity cleared.
    Destroyed {
        cluster_id: String,
        /// Container ids removed, or already gone.
        removed: Vec<String>,
        /// Container ids whose removal failed, with the reason.
        failed: Vec<(String, String)>,
    },
    /// No cluster identity was found.
    NotRunning,
}

impl DestroyOutcome {
    #[must_use]
    pub fn cluster_id(&self) -> Option<&str> {
        match self {
            Self::Destroyed { cluster_id, .. } => Some(cluster_id),
            Self::NotRunning => None,
        }
    }
}

/// Live view of one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberInfo {
    pub role: Role,
    pub container_id: String,
    pub name: String,
    pub ip_address: Option<String>,
    pub running: bool,
}

/// Live view of an active cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterInfo {
    pub cluster_id: String,
    pub created_at: DateTime<Utc>,
    pub master_url: Option<String>,
    pub members: Vec<MemberInfo>,
}

impl ClusterInfo {
    /// Members whose container is still running.
    #[must_use]
    pub fn running_members(&self) -> usize {
        self.members.iter().filter(|m| m.running).count()
    }
}
