//! Ports driven by inbound adapters.

pub mod operator;

pub use operator::{ClusterOperator, DestroyRequest, InfoRequest, UpOutcome, UpRequest};
