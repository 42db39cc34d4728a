//! Scripted [`ClusterObserver`] for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::domain::{MasterEndpoint, MasterState};
use crate::error::{Error, Result};
use crate::port::observer::ClusterObserver;

/// Answers `master_state` from a fixed plan.
///
/// The first `failures` calls fail as an unreachable master would, the next
/// `leaderless` calls return a document without a leader, and every later
/// call returns a document with a leader. `never_ready` never elects one.
pub struct ScriptedObserver {
    failures: usize,
    leaderless: usize,
    ready: bool,
    calls: AtomicUsize,
    endpoints: Mutex<Vec<MasterEndpoint>>,
}

impl ScriptedObserver {
    /// Unreachable for `calls` calls, then a leader.
    pub fn leader_after(calls: usize) -> Self {
        Self::plan(calls, 0, true)
    }

    /// Reachable but leaderless for `calls` calls, then a leader.
    pub fn leaderless_for(calls: usize) -> Self {
        Self::plan(0, calls, true)
    }

    /// Reachable, never elects a leader.
    pub fn never_ready() -> Self {
        Self::plan(0, 0, false)
    }

    fn plan(failures: usize, leaderless: usize, ready: bool) -> Self {
        Self {
            failures,
            leaderless,
            ready,
            calls: AtomicUsize::new(0),
            endpoints: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Endpoints queried, in order.
    pub fn endpoints(&self) -> Vec<MasterEndpoint> {
        self.endpoints
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

/// A state document with a leader and `workers` activated workers.
pub fn state_with_leader(endpoint: &MasterEndpoint, workers: u64) -> MasterState {
    MasterState(json!({
        "leader": format!("master@{endpoint}"),
        "activated_slaves": workers,
    }))
}

#[async_trait]
impl ClusterObserver for ScriptedObserver {
    async fn master_state(&self, endpoint: &MasterEndpoint) -> Result<MasterState> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut endpoints) = self.endpoints.lock() {
            endpoints.push(endpoint.clone());
        }

        if call < self.failures {
            return Err(Error::runtime("fetch master state", "connection refused"));
        }
        if !self.ready || call < self.failures + self.leaderless {
            return Ok(MasterState(json!({ "activated_slaves": 0 })));
        }
        Ok(state_with_leader(endpoint, 1))
    }
}
