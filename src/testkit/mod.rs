//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`runtime`]: `FakeRuntime`, an in-memory scriptable container runtime.
//! - [`observer`]: `ScriptedObserver`, a master state source with a fixed plan.
//! - [`store`]: `MemoryStore`, an in-memory identity store.
//! - [`config`]: canonical cluster configs with fast probe policies.

pub mod config;
pub mod observer;
pub mod runtime;
pub mod store;
