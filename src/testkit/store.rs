//! In-memory [`ClusterStore`] for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::domain::ClusterIdentity;
use crate::error::Result;
use crate::port::store::ClusterStore;

/// Holds the identity in memory and counts saves.
#[derive(Default)]
pub struct MemoryStore {
    identity: Mutex<Option<ClusterIdentity>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<ClusterIdentity>> {
        self.identity
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ClusterStore for MemoryStore {
    fn save(&self, identity: &ClusterIdentity) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.slot() = Some(identity.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<ClusterIdentity>> {
        Ok(self.slot().clone())
    }

    fn clear(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}
