//! Path utilities for minicluster.
//!
//! Cluster state lives next to the project that started it:
//! - `./.minicluster/cluster.json` - identity of the running cluster
//!
//! User-wide settings live under `~/.minicluster/`:
//! - `~/.minicluster/config.toml` - fallback settings file

use std::path::PathBuf;

/// Name of the per-user and per-project state directory.
const DIR_NAME: &str = ".minicluster";

/// Returns the minicluster home directory (`~/.minicluster/`).
pub fn home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DIR_NAME)
}

/// Returns the user-wide settings file (`~/.minicluster/config.toml`).
pub fn user_config() -> PathBuf {
    home_dir().join("config.toml")
}

/// Returns the default state directory (`./.minicluster/`).
pub fn default_state_dir() -> PathBuf {
    PathBuf::from(DIR_NAME)
}
