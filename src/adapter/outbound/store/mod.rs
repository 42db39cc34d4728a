//! Persistence adapters.

mod file;

pub use file::{ClusterStateStore, DEFAULT_STATE_DIR, IDENTITY_FILE};
