//! Outbound adapters (driven side).

pub mod docker;
pub mod http;
pub mod store;
