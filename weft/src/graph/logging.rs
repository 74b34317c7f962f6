//! Structured logging for graph execution events.

use crate::error::GraphError;

/// Log run start.
pub fn log_run_start(run_id: Option<&str>) {
    tracing::info!(run_id = run_id.unwrap_or("-"), "Starting graph run");
}

/// Log node execution start.
pub fn log_node_start(node_id: &str, step: u32) {
    tracing::debug!(node_id, step, "Starting node execution");
}

/// Log node completion with the number of Commands it produced.
pub fn log_node_complete(node_id: &str, commands: usize) {
    tracing::debug!(node_id, commands, "Node execution complete");
}

/// Log the committed merge of one step.
pub fn log_state_update(node_id: &str, fields: usize) {
    tracing::debug!(node_id, fields, "State updated");
}

/// Log run completion.
pub fn log_run_complete(steps: u32) {
    tracing::info!(steps, "Graph run complete");
}

/// Log run failure.
pub fn log_run_error(error: &GraphError) {
    tracing::error!(?error, "Graph run failed");
}
