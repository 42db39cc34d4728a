//! Runtime-agnostic cluster types.

mod container;
mod identity;
mod master;
mod report;
mod role;

pub use container::{short_id, Container, ContainerSpec, PortBinding};
pub use identity::{ClusterIdentity, ClusterMember, IDENTITY_VERSION};
pub use master::{MasterEndpoint, MasterState};
pub use report::{ClusterInfo, DestroyOutcome, MemberInfo};
pub use role::Role;
