//! Minicluster - ephemeral multi-container test clusters on Docker.
//!
//! A cluster is one coordination service, one master and N workers, each in
//! its own container. `up` creates them in dependency order, waits for every
//! container to answer and for the master to report a leader, then leaves the
//! cluster running and records its identity on disk. `destroy` removes it
//! again; `info` reports on it.
//!
//! # Architecture
//!
//! - **`domain`** - Pure data: container specs, roles, the persisted
//!   cluster identity, and what commands report back.
//! - **`port`** - Traits at the seams: [`port::runtime::ContainerRuntime`],
//!   [`port::observer::ClusterObserver`], [`port::store::ClusterStore`], and
//!   the inbound [`port::inbound::operator::ClusterOperator`].
//! - **`application`** - The orchestration core: validated configuration,
//!   readiness probing, container lifecycle with guaranteed cleanup, and the
//!   cluster state machine.
//! - **`adapter`** - Docker (bollard), the master's HTTP state endpoint
//!   (reqwest), the JSON identity file, and the CLI (clap).
//! - **`infrastructure`** - Settings files, logging, OS signals, and the
//!   operator that wires the core to the adapters.
//!
//! # Features
//!
//! - `testkit` - Expose in-memory runtime, observer and store doubles for
//!   integration tests.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use minicluster::adapter::outbound::docker::DockerRuntime;
//! use minicluster::application::config::{ClusterConfig, DEFAULT_WORKER_RESOURCES};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClusterConfig::builder()
//!     .runtime(Arc::new(DockerRuntime::connect_local()?))
//!     .workers(2)
//!     .worker_resources(vec![DEFAULT_WORKER_RESOURCES.to_string(); 2])
//!     .build()?;
//! assert_eq!(config.workers(), 2);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
