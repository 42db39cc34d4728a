//! Handler for the `info` command.

use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::output;
use crate::domain::ClusterInfo;
use crate::error::Result;
use crate::port::inbound::operator::{ClusterOperator, InfoRequest};

/// Message printed when the state directory records no cluster.
pub const NOT_RUNNING: &str = "Cluster is not running";

/// Execute the info command.
pub async fn execute(state_dir: &Path, operator: &dyn ClusterOperator) -> Result<()> {
    let info = operator
        .info(InfoRequest {
            state_dir: state_dir.to_path_buf(),
        })
        .await?;

    match info {
        Some(info) if output::is_json() => output::document(&json!({
            "command": "info",
            "status": "running",
            "cluster": info,
        })),
        Some(info) => {
            output::banner();
            print_cluster(&info);
        }
        None if output::is_json() => output::document(&json!({
            "command": "info",
            "status": "not_running",
        })),
        None => output::warning(NOT_RUNNING),
    }
    Ok(())
}

/// Identity fields followed by the member table.
pub fn print_cluster(info: &ClusterInfo) {
    output::field("Cluster", output::cluster_id(&info.cluster_id));
    output::field("Created", info.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    if let Some(url) = &info.master_url {
        output::field("Master", url);
    }
    output::field(
        "Members",
        format!("{}/{} running", info.running_members(), info.members.len()),
    );
    output::members(&info.members);
}
