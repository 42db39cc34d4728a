//! The master's state document, the cluster-level readiness signal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where the master's HTTP endpoint can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterEndpoint {
    pub host: String,
    pub port: u16,
}

impl MasterEndpoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Base URL of the master's HTTP API.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for MasterEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Raw state document as reported by the master.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MasterState(pub serde_json::Value);

impl MasterState {
    /// The elected leader, when one is reported and non-empty.
    #[must_use]
    pub fn leader(&self) -> Option<&str> {
        self.0
            .get("leader")
            .and_then(serde_json::Value::as_str)
            .filter(|leader| !leader.trim().is_empty())
    }

    /// Whether a leader has been elected.
    #[must_use]
    pub fn has_leader(&self) -> bool {
        self.leader().is_some()
    }

    /// Number of workers the master has activated.
    #[must_use]
    pub fn activated_workers(&self) -> u64 {
        self.0
            .get("activated_slaves")
            .and_then(serde_json::Value::as_f64)
            .map_or(0, |count| count.max(0.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn leader_requires_non_empty_value() {
        assert!(!MasterState(json!({})).has_leader());
        assert!(!MasterState(json!({ "leader": "" })).has_leader());
        assert!(!MasterState(json!({ "leader": null })).has_leader());
        let state = MasterState(json!({ "leader": "master@172.17.0.3:5050" }));
        assert_eq!(state.leader(), Some("master@172.17.0.3:5050"));
    }

    #[test]
    fn activated_workers_reads_float_counts() {
        let state = MasterState(json!({ "activated_slaves": 3.0 }));
        assert_eq!(state.activated_workers(), 3);
        assert_eq!(MasterState::default().activated_workers(), 0);
    }

    #[test]
    fn endpoint_formats_url() {
        let endpoint = MasterEndpoint::new("172.17.0.3", 5050);
        assert_eq!(endpoint.base_url(), "http://172.17.0.3:5050");
        assert_eq!(endpoint.to_string(), "172.17.0.3:5050");
    }
}
