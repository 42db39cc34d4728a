//! Handler for the `up` command.

use std::path::Path;
use std::time::Duration;

use serde_json::json;

use crate::adapter::inbound::cli::command::UpArgs;
use crate::adapter::inbound::cli::{info, output};
use crate::error::{Error, Result};
use crate::port::inbound::operator::{ClusterOperator, UpOutcome, UpRequest};

/// Execute the up command.
pub async fn execute(args: &UpArgs, state_dir: &Path, operator: &dyn ClusterOperator) -> Result<()> {
    let request = build_request(args, state_dir);

    let progress = output::Progress::start("Starting cluster");
    let outcome = match operator.up(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            progress.fail(failure_message(&e));
            return Err(e);
        }
    };

    match outcome {
        UpOutcome::AlreadyRunning { cluster_id } => {
            progress.clear();
            if output::is_json() {
                output::document(&json!({
                    "command": "up",
                    "status": "already_running",
                    "cluster_id": cluster_id,
                }));
                return Ok(());
            }
            output::warning(&format!("Cluster {cluster_id} is already running"));
            output::hint("run `minicluster destroy` to remove it");
        }
        UpOutcome::Started {
            info,
            config_source,
        } => {
            if output::is_json() {
                progress.clear();
                output::document(&json!({
                    "command": "up",
                    "status": "started",
                    "config": config_source.map(|p| p.display().to_string()),
                    "cluster": info,
                }));
                return Ok(());
            }
            progress.succeed(&format!("Cluster {} is up", info.cluster_id));
            if let Some(path) = &config_source {
                output::field("Settings", path.display());
            }
            info::print_cluster(&info);
        }
    }
    Ok(())
}

/// Configuration problems stop `up` before any container exists; anything
/// later is rolled back by the operator.
fn failure_message(error: &Error) -> &'static str {
    match error {
        Error::Config(_) | Error::AlreadyActive { .. } => "Cluster was not started",
        Error::Cancelled => "Interrupted; removed what was started",
        _ => "Cluster did not come up; removed what was started",
    }
}

fn build_request(args: &UpArgs, state_dir: &Path) -> UpRequest {
    UpRequest {
        state_dir: state_dir.to_path_buf(),
        config_path: args.config.clone(),
        workers: args.workers,
        map_ports_to_host: args.map_ports_to_host,
        deadline: args.timeout.map(Duration::from_secs),
    }
}
