//! Handler for the `destroy` command.

use std::path::Path;

use serde_json::json;

use crate::adapter::inbound::cli::{info::NOT_RUNNING, output};
use crate::domain::{short_id, DestroyOutcome};
use crate::error::Result;
use crate::port::inbound::operator::{ClusterOperator, DestroyRequest};

/// Execute the destroy command.
pub async fn execute(state_dir: &Path, operator: &dyn ClusterOperator) -> Result<()> {
    let progress = output::Progress::start("Destroying cluster");
    let outcome = match operator
        .destroy(DestroyRequest {
            state_dir: state_dir.to_path_buf(),
        })
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            progress.fail("Destroy failed");
            return Err(e);
        }
    };

    if output::is_json() {
        progress.clear();
        output::document(&json!({
            "command": "destroy",
            "outcome": outcome,
        }));
        return Ok(());
    }

    match outcome {
        DestroyOutcome::NotRunning => {
            progress.clear();
            output::warning(NOT_RUNNING);
        }
        DestroyOutcome::Destroyed {
            cluster_id,
            removed,
            failed,
        } => {
            progress.succeed(&format!("Destroyed cluster {cluster_id}"));
            output::field("Removed", removed.len());
            for (id, reason) in &failed {
                output::warning(&format!("Could not remove {}: {reason}", short_id(id)));
            }
            if !failed.is_empty() {
                output::hint("remove the leftovers with `docker rm -f <id>`");
            }
        }
    }
    Ok(())
}
