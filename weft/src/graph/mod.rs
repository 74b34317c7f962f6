//! Graph building and execution: [`Node`], [`StateGraph`], [`CompiledGraph`].

mod compiled;
mod logging;
mod node;
mod state_graph;

pub use compiled::{CompiledGraph, RunStatus};
pub use node::{DynamicInputFn, Node, StepContext};
pub use state_graph::{CompilationError, StateGraph, DEFAULT_STEP_LIMIT, END, START};
