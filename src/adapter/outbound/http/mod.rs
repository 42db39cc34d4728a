//! HTTP adapters.

mod master;

pub use master::{MasterStateClient, STATE_PATH};
