//! Capability traits the orchestration core consumes and the CLI drives.

pub mod inbound;
pub mod observer;
pub mod runtime;
pub mod store;

pub use observer::ClusterObserver;
pub use runtime::{ContainerInspection, ContainerRuntime, ContainerStatus, ExecOutput, LogStream};
pub use store::ClusterStore;
