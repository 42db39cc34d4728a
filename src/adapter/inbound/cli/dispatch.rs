//! Routes a parsed command line to its handler.

use crate::adapter::inbound::cli::command::{Cli, Commands};
use crate::adapter::inbound::cli::{destroy, info, output, up};
use crate::error::Result;
use crate::port::inbound::operator::ClusterOperator;

/// Apply the global output flags. Call before any handler prints.
pub fn configure_output(cli: &Cli) {
    output::apply_color(&cli.color);
    output::configure(output::OutputConfig::new(cli.json, cli.quiet, cli.verbose));
}

/// Run the selected subcommand against `operator`.
pub async fn run(cli: &Cli, operator: &dyn ClusterOperator) -> Result<()> {
    match &cli.command {
        Commands::Up(args) => up::execute(args, &cli.state_dir, operator).await,
        Commands::Destroy => destroy::execute(&cli.state_dir, operator).await,
        Commands::Info => info::execute(&cli.state_dir, operator).await,
    }
}
