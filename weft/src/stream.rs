//! Run events for stream-based observation of graph execution.
//!
//! `CompiledGraph::stream` emits these over a one-shot, forward-only channel:
//! one event per completed step per enabled mode, ending when the run does.

use serde::Serialize;

use crate::state::{StateUpdate, StateValues};

/// Which events a streamed run emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamMode {
    /// Per-step contribution: the step's merged update fields only.
    Updates,
    /// Full post-merge state snapshot per step.
    Values,
}

/// One event observed from a streamed run.
///
/// **Interaction**: Produced by `CompiledGraph`'s run loop; consumed as a
/// finite `ReceiverStream`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// A step completed; carries only the fields that step contributed.
    Updates { node: String, update: StateUpdate },
    /// A step completed; carries the whole post-merge state.
    Values { state: StateValues },
}
