//! Node trait and the per-step context the executor hands to it.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::command::Command;
use crate::config::RunConfig;
use crate::error::GraphError;
use crate::state::{StateSchema, StateValues};

/// Derives ephemeral input (e.g. a prompt) from the current state.
///
/// Registered per node via `StateGraph::add_node_with_input`; the executor
/// invokes it with the state exactly as committed after the previous step's
/// merges, immediately before the node runs. Must be pure and read-only.
pub type DynamicInputFn = Arc<dyn Fn(&StateValues) -> Value + Send + Sync>;

/// Per-step context passed to a node alongside the current state.
///
/// `derived_input` is present only for nodes declared with a dynamic-input
/// function; it is recomputed every step, never cached. `schema` lets the
/// tool-dispatch node aggregate per-call Commands under the same reduction
/// rules the executor merges with.
pub struct StepContext<'a> {
    /// Configuration for the run; opaque to the executor, readable by tools.
    pub config: &'a RunConfig,
    /// The run's state schema.
    pub schema: &'a StateSchema,
    /// Output of this node's dynamic-input function for this step, if declared.
    pub derived_input: Option<Value>,
    /// Zero-based index of the current step.
    pub step: u32,
}

impl StepContext<'_> {
    /// The derived input for this step, if the node declared an input function.
    pub fn derived_input(&self) -> Option<&Value> {
        self.derived_input.as_ref()
    }
}

/// A named unit of computation in the graph.
///
/// A node is a pure function of the current merged state: it returns zero or
/// more [`Command`]s (zero means "continue along the default edge with no
/// update"). Nodes never mutate state directly; the executor merges their
/// Commands through the schema after the node returns.
///
/// **Interaction**: Registered in `StateGraph`; invoked by `CompiledGraph`'s
/// run loop with the post-merge state of the previous step.
#[async_trait]
pub trait Node: Send + Sync {
    /// Stable node id used in edges and routing directives.
    fn id(&self) -> &str;

    /// Executes one step. Errors here are unrecoverable and fail the run;
    /// tool-level errors are contained inside the tool-dispatch node instead.
    async fn run(
        &self,
        state: &StateValues,
        ctx: &StepContext<'_>,
    ) -> Result<Vec<Command>, GraphError>;
}
