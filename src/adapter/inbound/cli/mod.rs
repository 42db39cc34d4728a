//! CLI module graph.

pub mod command;
pub mod destroy;
pub mod diagnostic;
pub mod dispatch;
pub mod info;
pub mod output;
pub mod paths;
pub mod up;

pub use command::{Cli, Commands, UpArgs};
pub use dispatch::{configure_output, run};
