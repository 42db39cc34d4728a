//! Orchestration core: configuration, readiness, lifecycle and the cluster
//! state machine.

pub mod config;
pub mod lifecycle;
pub mod orchestrator;
pub mod probe;
pub mod shutdown;
pub mod topology;

pub use config::{ClusterConfig, ClusterConfigBuilder, ClusterImages, ImageRef};
pub use lifecycle::{ContainerLifecycleManager, StopReport};
pub use orchestrator::{ClusterOrchestrator, ClusterState};
pub use probe::{ProbeOutcome, ProbePolicy, ReadinessProbe};
pub use shutdown::{ShutdownReason, ShutdownSignal};
