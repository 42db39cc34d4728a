use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("no container runtime available: {reason}")]
    NoRuntime { reason: String },

    #[error("failed to read config file {path}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failures of the persisted cluster identity.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("failed to read cluster state {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write cluster state {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to remove cluster state {path}")]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cluster state {path} is corrupt")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode cluster state")]
    Encode(#[source] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to pull image {image}\n{log_tail}")]
    ImagePull { image: String, log_tail: String },

    #[error("failed to build image {tag}\n{log_tail}")]
    ImageBuild { tag: String, log_tail: String },

    #[error("container {container_id} not ready after {elapsed:?} ({attempts} attempts)")]
    Readiness {
        container_id: String,
        elapsed: Duration,
        attempts: u32,
    },

    #[error("timed out waiting for {condition} after {elapsed:?} ({attempts} attempts)")]
    Timeout {
        condition: String,
        elapsed: Duration,
        attempts: u32,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("removal already in progress: {0}")]
    RemovalInProgress(String),

    #[error("container {container_id} has no network address: {reason}")]
    Network {
        container_id: String,
        reason: String,
    },

    #[error("container runtime failed to {operation}: {reason}")]
    Runtime {
        operation: &'static str,
        reason: String,
    },

    #[error("cluster {cluster_id} is already running")]
    AlreadyActive { cluster_id: String },

    #[error("cannot {operation} while cluster is {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a runtime failure from any displayable cause.
    pub fn runtime(operation: &'static str, reason: impl ToString) -> Self {
        Self::Runtime {
            operation,
            reason: reason.to_string(),
        }
    }

    /// True for errors that mean "the thing is already gone".
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True when a removal can count as done: the container is gone or
    /// someone else is already removing it.
    #[must_use]
    pub const fn is_gone(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::RemovalInProgress(_))
    }

    /// True for bounded waits that ran out of time.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Readiness { .. })
    }
}
