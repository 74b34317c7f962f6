//! StateGraph builder: nodes, default edges, dynamic-input functions.
//!
//! `compile()` validates the wiring and produces an immutable
//! [`CompiledGraph`](super::CompiledGraph) that supports invoke/stream.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use super::compiled::CompiledGraph;
use super::node::{DynamicInputFn, Node};
use crate::state::StateSchema;

/// Virtual source of the entry edge: `add_edge(START, "first")`.
pub const START: &str = "__start__";
/// Virtual terminal target: `add_edge("last", END)`.
pub const END: &str = "__end__";

/// Default step limit applied when the builder does not override it.
pub const DEFAULT_STEP_LIMIT: u32 = 25;

/// Graph wiring error found at compile time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    /// No `add_edge(START, ..)` was given.
    #[error("graph has no entry edge; add_edge(START, ..) is required")]
    MissingEntry,
    /// An edge endpoint names a node that was never added.
    #[error("edge references unknown node '{0}'")]
    UnknownEdgeNode(String),
    /// A dynamic-input function was registered for an unknown node.
    #[error("dynamic input registered for unknown node '{0}'")]
    UnknownInputNode(String),
}

/// Mutable builder for a state graph.
///
/// Each node has at most one static default edge; routing beyond that comes
/// from the Commands nodes return at runtime. Registering a node or edge
/// under an existing key replaces the previous entry.
pub struct StateGraph {
    schema: StateSchema,
    nodes: HashMap<String, Arc<dyn Node>>,
    edges: HashMap<String, String>,
    entry: Option<String>,
    input_fns: HashMap<String, DynamicInputFn>,
    step_limit: u32,
}

impl StateGraph {
    /// Creates a builder over the given state schema.
    pub fn new(schema: StateSchema) -> Self {
        Self {
            schema,
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
            input_fns: HashMap::new(),
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    /// Overrides the step limit (default [`DEFAULT_STEP_LIMIT`]).
    pub fn with_step_limit(mut self, limit: u32) -> Self {
        self.step_limit = limit;
        self
    }

    /// Adds a node under the given id.
    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn Node>) -> &mut Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Adds a node with a dynamic-input function recomputed before every
    /// execution of the node from the post-merge state of the previous step.
    pub fn add_node_with_input(
        &mut self,
        id: impl Into<String>,
        node: Arc<dyn Node>,
        input: DynamicInputFn,
    ) -> &mut Self {
        let id = id.into();
        self.input_fns.insert(id.clone(), input);
        self.nodes.insert(id, node);
        self
    }

    /// Adds the static default edge `from -> to`. `START` as `from` sets the
    /// entry node; `END` as `to` makes `from` terminal by default.
    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        let from = from.into();
        let to = to.into();
        if from == START {
            self.entry = Some(to);
        } else {
            self.edges.insert(from, to);
        }
        self
    }

    /// Validates the wiring and produces an immutable executable graph.
    pub fn compile(&self) -> Result<CompiledGraph, CompilationError> {
        let entry = self.entry.clone().ok_or(CompilationError::MissingEntry)?;
        if !self.nodes.contains_key(&entry) {
            return Err(CompilationError::UnknownEdgeNode(entry));
        }
        for (from, to) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(CompilationError::UnknownEdgeNode(from.clone()));
            }
            if to != END && !self.nodes.contains_key(to) {
                return Err(CompilationError::UnknownEdgeNode(to.clone()));
            }
        }
        for id in self.input_fns.keys() {
            if !self.nodes.contains_key(id) {
                return Err(CompilationError::UnknownInputNode(id.clone()));
            }
        }
        Ok(CompiledGraph {
            schema: self.schema.clone(),
            nodes: self.nodes.clone(),
            entry,
            edges: self.edges.clone(),
            input_fns: self.input_fns.clone(),
            step_limit: self.step_limit,
        })
    }
}
