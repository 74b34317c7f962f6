//! # Weft
//!
//! A state-graph execution engine with Command-driven partial state updates.
//! Nodes are pure functions of the current merged state; they return
//! [`Command`]s carrying a partial update plus an optional routing
//! directive. The executor merges updates through per-field reduction rules
//! ([`Reducer`]) and recomputes each node's dynamic input (e.g. a prompt)
//! from the post-merge state before the node runs: a tool's state update in
//! one step is visible to the prompt function feeding the next decision
//! step, never within the step that produced it.
//!
//! ## Design principles
//!
//! - **One state per run**: a single [`StateValues`] mapping flows through
//!   the graph; nodes never mutate it, the executor merges their Commands.
//! - **Declared reductions**: every field's merge behavior (replace, append,
//!   shallow-merge) is declared once in the [`StateSchema`].
//! - **Contained tool errors**: unknown tools and tool domain errors become
//!   conversation-visible result-messages; only schema or node errors fail a
//!   run, and a failed run keeps its last-good state ([`RunFailure`]).
//! - **Deterministic aggregation**: concurrent tool calls in one step merge
//!   in request order, regardless of completion order.
//!
//! ## Main modules
//!
//! - [`graph`]: [`StateGraph`], [`CompiledGraph`], [`Node`], [`StepContext`] —
//!   build and run state graphs.
//! - [`state`]: [`StateSchema`], [`Reducer`], [`StateValues`] — typed state
//!   and merge rules.
//! - [`command`]: [`Command`], [`Goto`] — the partial-update protocol.
//! - [`tool`]: [`Tool`], [`ToolRegistry`], [`ToolDispatchNode`] — named
//!   callables and their dispatch.
//! - [`model`]: [`ChatModel`], [`ModelNode`], [`ScriptedModel`] — the
//!   decision collaborator.
//! - [`agent`]: [`AgentBuilder`] — the prebuilt model ↔ tools loop.
//! - [`stream`]: [`RunEvent`], [`StreamMode`] — per-step observation.

pub mod agent;
pub mod command;
pub mod config;
pub mod error;
pub mod graph;
pub mod message;
pub mod model;
pub mod state;
pub mod stream;
pub mod tool;

pub use agent::{agent_schema, AgentBuilder};
pub use command::{Command, Goto};
pub use config::RunConfig;
pub use error::{GraphError, RunFailure};
pub use graph::{
    CompilationError, CompiledGraph, DynamicInputFn, Node, RunStatus, StateGraph, StepContext,
    DEFAULT_STEP_LIMIT, END, START,
};
pub use message::{messages_from_values, Message, ToolCall};
pub use model::{ChatModel, ModelError, ModelNode, ModelResponse, ScriptedModel, MODEL_NODE};
pub use state::{Reducer, SchemaViolation, StateSchema, StateUpdate, StateValues, MESSAGES_KEY};
pub use stream::{RunEvent, StreamMode};
pub use tool::{
    FnTool, Tool, ToolCallContext, ToolDispatchNode, ToolError, ToolOutput, ToolRegistry,
    ToolSpec, TOOL_DISPATCH_NODE,
};
