use std::process::ExitCode;

use clap::Parser;
use minicluster::adapter::inbound::cli::{self, diagnostic, output, Cli};
use minicluster::application::ShutdownSignal;
use minicluster::infrastructure::config::settings::Settings;
use minicluster::infrastructure::operator::Operator;
use minicluster::infrastructure::signals;
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    cli::configure_output(&cli);

    // Settings errors surface from the command itself; logging falls back
    // to defaults until then.
    let logging = Settings::resolve(cli.config_path())
        .map(|(settings, _)| settings.logging)
        .unwrap_or_default();
    let steps = i8::try_from(cli.verbose).unwrap_or(i8::MAX) - i8::from(cli.quiet);
    logging.adjusted(steps).json(cli.json).init();
    debug!(version = env!("CARGO_PKG_VERSION"), "minicluster starting");

    let shutdown = ShutdownSignal::new();
    signals::listen(&shutdown);

    let operator = Operator::new(shutdown);
    match cli::run(&cli, &operator).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(error = %e, "Command failed");
            let (report, code) = diagnostic::report(e);
            if output::is_json() {
                output::error(&report.to_string());
            } else {
                eprintln!("{report:?}");
            }
            ExitCode::from(code)
        }
    }
}
