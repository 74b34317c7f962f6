//! Command: the partial-update protocol between nodes and the executor.
//!
//! A node returns zero or more Commands per step; the executor merges each
//! `update` into the state in production order and routes on the last
//! Command's `goto`. No directive means the node's static default edge is
//! followed (or the run terminates when there is none).

use serde_json::Value;

use crate::state::StateUpdate;

/// Control-flow directive carried by a Command.
///
/// - **Node(id)**: run the node with the given id next.
/// - **End**: stop; return the current state as the final result.
///
/// **Interaction**: Read by `CompiledGraph`'s run loop after the step's
/// merges are committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Goto {
    /// Run the node with the given id next.
    Node(String),
    /// Stop and return the current state.
    End,
}

/// An immutable value produced by a node execution: a partial state update
/// plus an optional control-flow directive.
///
/// `update` may reference only schema-declared fields; an unknown field is a
/// `SchemaViolation` when the executor merges the step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Command {
    /// Proposed per-field values, merged under each field's reduction rule.
    pub update: StateUpdate,
    /// Where to go next; `None` defers to the node's static default edge.
    pub goto: Option<Goto>,
}

impl Command {
    /// Creates an empty Command (no update, no directive).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one field to the update.
    pub fn with_update(mut self, field: impl Into<String>, value: Value) -> Self {
        self.update.insert(field.into(), value);
        self
    }

    /// Extends the update with every entry of `update`.
    pub fn with_updates(mut self, update: StateUpdate) -> Self {
        self.update.extend(update);
        self
    }

    /// Directs the executor to the given node.
    pub fn with_goto(mut self, node: impl Into<String>) -> Self {
        self.goto = Some(Goto::Node(node.into()));
        self
    }

    /// Directs the executor to terminate the run after this step.
    pub fn end(mut self) -> Self {
        self.goto = Some(Goto::End);
        self
    }

    /// True when the Command carries neither an update nor a directive.
    pub fn is_empty(&self) -> bool {
        self.update.is_empty() && self.goto.is_none()
    }
}
