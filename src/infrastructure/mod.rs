//! Composition root: settings, logging, signals and the operator that wires
//! the core to its adapters.

pub mod config;
pub mod operator;
pub mod runtime;
pub mod signals;
