//! Command-line interface definitions.
//!
//! Defines the CLI structure for the minicluster binary using `clap`. The
//! three subcommands bring a cluster up, tear it down, and describe it.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::paths;

/// Ephemeral multi-container test clusters on Docker
#[derive(Parser, Debug)]
#[command(name = "minicluster")]
#[command(version)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Directory holding the running cluster's identity
    #[arg(long, global = true, default_value_os_t = paths::default_state_dir())]
    pub state_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Settings file named on the command line, if any.
    #[must_use]
    pub fn config_path(&self) -> Option<&std::path::Path> {
        match &self.command {
            Commands::Up(args) => args.config.as_deref(),
            Commands::Destroy | Commands::Info => None,
        }
    }
}

/// Color output mode for terminal rendering.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Top-level subcommands for the minicluster CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create and start a cluster, then leave it running
    Up(UpArgs),

    /// Remove every container of the running cluster
    Destroy,

    /// Show the running cluster and its members
    Info,
}

/// Arguments for `minicluster up`.
#[derive(Parser, Debug, Default)]
pub struct UpArgs {
    /// Settings file (default: ./minicluster.toml, then ~/.minicluster/config.toml)
    #[arg(long, short = 'c', value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Publish the master port on the host
    #[arg(long)]
    pub map_ports_to_host: bool,

    /// Number of workers (overrides the settings file)
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Give up and remove everything after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn up_flags_parse() {
        let cli = Cli::try_parse_from([
            "minicluster",
            "up",
            "--config",
            "cluster.toml",
            "--workers",
            "3",
            "--map-ports-to-host",
            "--timeout",
            "90",
        ])
        .unwrap();

        let Commands::Up(args) = &cli.command else {
            panic!("expected up");
        };
        assert_eq!(args.workers, Some(3));
        assert!(args.map_ports_to_host);
        assert_eq!(args.timeout, Some(90));
        assert_eq!(cli.config_path(), Some(std::path::Path::new("cluster.toml")));
    }

    #[test]
    fn global_flags_follow_subcommand() {
        let cli = Cli::try_parse_from([
            "minicluster",
            "info",
            "--json",
            "-vv",
            "--state-dir",
            "/tmp/mc",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Info));
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.state_dir, PathBuf::from("/tmp/mc"));
        assert_eq!(cli.config_path(), None);
    }

    #[test]
    fn state_dir_defaults_to_working_directory() {
        let cli = Cli::try_parse_from(["minicluster", "destroy"]).unwrap();
        assert_eq!(cli.state_dir, paths::default_state_dir());
    }
}
