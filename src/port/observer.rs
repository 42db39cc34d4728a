//! Cluster-level observation port.

use async_trait::async_trait;

use crate::domain::{MasterEndpoint, MasterState};
use crate::error::Result;

/// Read-only view of the signal a cluster exposes once it is usable.
#[async_trait]
pub trait ClusterObserver: Send + Sync {
    /// Fetch the master's current state document.
    async fn master_state(&self, endpoint: &MasterEndpoint) -> Result<MasterState>;
}
