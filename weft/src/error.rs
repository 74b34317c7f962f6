//! Run-fatal error types.
//!
//! Tool-level errors (`ToolError`) are contained by the dispatch node and
//! turned into conversation-visible result-messages; only the errors here
//! halt a run. `RunFailure` pairs the cause with the state as of the last
//! successful merge so callers can inspect what the run had built up.

use thiserror::Error;

use crate::state::{SchemaViolation, StateValues};

/// Fatal error during graph execution. The run transitions to Failed.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A Command's update broke the state schema contract.
    #[error(transparent)]
    Schema(#[from] SchemaViolation),

    /// A node raised an unrecoverable error (not a tool-level error).
    #[error("node '{node}' failed: {message}")]
    NodeFailed { node: String, message: String },

    /// A routing directive or edge named a node the graph does not have.
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// The run exceeded the configured step limit.
    #[error("step limit of {0} exceeded")]
    StepLimitExceeded(u32),

    /// The run's cancellation token fired; observed at a step boundary.
    #[error("run cancelled")]
    Cancelled,

    /// The compiled graph has no nodes or no entry.
    #[error("empty graph")]
    EmptyGraph,
}

impl GraphError {
    /// Wraps an arbitrary node error with the failing node's id.
    pub fn node_failed(node: impl Into<String>, message: impl ToString) -> Self {
        Self::NodeFailed {
            node: node.into(),
            message: message.to_string(),
        }
    }
}

/// Failure of one run: the cause plus the state as of the last successful
/// merge. The state is never discarded; it stays introspectable for
/// diagnostics.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    /// Why the run failed.
    #[source]
    pub error: GraphError,
    /// State as committed by the last successful step merge.
    pub state: StateValues,
}
