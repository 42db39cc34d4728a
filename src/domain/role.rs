//! Roles a container plays inside a cluster.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The part a container plays in the cluster.
///
/// Declaration order is creation order: every role depends on the address of
/// the role before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Registry all members use to agree on the master location.
    Coordination,
    /// The master service.
    Master,
    /// A worker registered with the master.
    Worker,
}

impl Role {
    /// Lowercase name used in container names and labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Coordination => "coordination",
            Self::Master => "master",
            Self::Worker => "worker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_order_by_dependency() {
        let mut roles = vec![Role::Worker, Role::Coordination, Role::Master];
        roles.sort();
        assert_eq!(roles, vec![Role::Coordination, Role::Master, Role::Worker]);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&Role::Coordination).unwrap();
        assert_eq!(json, "\"coordination\"");
        let role: Role = serde_json::from_str("\"worker\"").unwrap();
        assert_eq!(role, Role::Worker);
    }
}
