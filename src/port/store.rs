//! Persistence port for the cluster identity.

use crate::domain::ClusterIdentity;
use crate::error::Result;

/// Single-writer storage for the identity of the active cluster.
///
/// Implementations are synchronous: the document is small and written a
/// handful of times per invocation.
pub trait ClusterStore: Send + Sync {
    /// Persist `identity`, replacing any earlier document.
    fn save(&self, identity: &ClusterIdentity) -> Result<()>;

    /// The persisted identity, or `None` when no cluster is recorded.
    fn load(&self) -> Result<Option<ClusterIdentity>>;

    /// Forget the persisted identity. Clearing nothing is not an error.
    fn clear(&self) -> Result<()>;
}
