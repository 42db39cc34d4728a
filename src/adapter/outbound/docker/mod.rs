//! Docker container runtime adapter.

mod runtime;

pub use runtime::DockerRuntime;
