//! Compiled graph: immutable, supports invoke and stream.
//!
//! Owns the run loop: select the node, recompute its dynamic input from the
//! post-merge state of the previous step, invoke it, merge its Commands
//! all-or-nothing, emit stream events, route on the last directive or the
//! static default edge, repeat until terminal.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::logging::{
    log_node_complete, log_node_start, log_run_complete, log_run_error, log_run_start,
    log_state_update,
};
use super::node::{DynamicInputFn, Node, StepContext};
use super::state_graph::END;
use crate::command::{Command, Goto};
use crate::config::RunConfig;
use crate::error::{GraphError, RunFailure};
use crate::state::{StateSchema, StateUpdate, StateValues};
use crate::stream::{RunEvent, StreamMode};

/// Execution status of one run.
///
/// Transitions: Idle → Running(node) → … → Terminated, or → Failed on a
/// schema or node error (and on cancellation or step-limit exhaustion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// No step pending yet.
    Idle,
    /// The named node is the current step.
    Running(String),
    /// A terminal directive was reached; the final state was returned.
    Terminated,
    /// The run failed; the last-good state travels in [`RunFailure`].
    Failed,
}

/// Compiled graph: immutable structure, shared by cloning.
///
/// Created by `StateGraph::compile()`. Each `invoke`/`stream` call is one
/// Run owning its state exclusively; the graph itself holds no run state and
/// may execute any number of runs, sequentially or in parallel.
#[derive(Clone)]
pub struct CompiledGraph {
    pub(super) schema: StateSchema,
    pub(super) nodes: HashMap<String, Arc<dyn Node>>,
    pub(super) entry: String,
    pub(super) edges: HashMap<String, String>,
    pub(super) input_fns: HashMap<String, DynamicInputFn>,
    pub(super) step_limit: u32,
}

impl std::fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("entry", &self.entry)
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("step_limit", &self.step_limit)
            .finish_non_exhaustive()
    }
}

impl CompiledGraph {
    /// The run's state schema.
    pub fn schema(&self) -> &StateSchema {
        &self.schema
    }

    /// Runs the graph from the entry node until a terminal directive.
    ///
    /// The initial state is seeded with schema defaults first. On failure the
    /// returned [`RunFailure`] carries the state as of the last successful
    /// step merge; nothing is discarded.
    pub async fn invoke(
        &self,
        state: StateValues,
        config: RunConfig,
    ) -> Result<StateValues, RunFailure> {
        let mut state = state;
        match self
            .run_loop(&mut state, &config, None, &HashSet::new())
            .await
        {
            Ok(()) => Ok(state),
            Err(error) => Err(RunFailure { error, state }),
        }
    }

    /// Runs the graph emitting [`RunEvent`]s per completed step.
    ///
    /// The returned stream is one-shot, forward-only and finite: it ends when
    /// the run terminates or fails. A failure ends the stream without an
    /// event; use [`invoke`](Self::invoke) when the failure cause and final
    /// state are needed.
    pub fn stream(
        &self,
        state: StateValues,
        config: RunConfig,
        modes: impl Into<HashSet<StreamMode>>,
    ) -> ReceiverStream<RunEvent> {
        let (tx, rx) = mpsc::channel(128);
        let graph = self.clone();
        let modes: HashSet<StreamMode> = modes.into();

        tokio::spawn(async move {
            let mut state = state;
            let _ = graph.run_loop(&mut state, &config, Some(&tx), &modes).await;
        });

        ReceiverStream::new(rx)
    }

    /// Shared run loop used by invoke() and stream().
    async fn run_loop(
        &self,
        state: &mut StateValues,
        config: &RunConfig,
        tx: Option<&mpsc::Sender<RunEvent>>,
        modes: &HashSet<StreamMode>,
    ) -> Result<(), GraphError> {
        if self.nodes.is_empty() || !self.nodes.contains_key(&self.entry) {
            return Err(GraphError::EmptyGraph);
        }

        log_run_start(config.run_id.as_deref());
        self.schema.seed(state);

        let mut status = RunStatus::Idle;
        let mut current = self.entry.clone();
        let mut step: u32 = 0;

        loop {
            // Cancellation is honored only here, between steps, so a
            // partially-completed step never applies a partial merge.
            if config.is_cancelled() {
                transition(&mut status, RunStatus::Failed);
                log_run_error(&GraphError::Cancelled);
                return Err(GraphError::Cancelled);
            }
            if step >= self.step_limit {
                transition(&mut status, RunStatus::Failed);
                log_run_error(&GraphError::StepLimitExceeded(self.step_limit));
                return Err(GraphError::StepLimitExceeded(self.step_limit));
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| GraphError::UnknownNode(current.clone()))?
                .clone();
            transition(&mut status, RunStatus::Running(current.clone()));
            log_node_start(&current, step);

            // Recompute the dynamic input from the state exactly as committed
            // after the previous step's merges, never earlier.
            let derived_input = self.input_fns.get(&current).map(|f| f(&*state));
            let ctx = StepContext {
                config,
                schema: &self.schema,
                derived_input,
                step,
            };

            let commands = match node.run(state, &ctx).await {
                Ok(commands) => commands,
                Err(e) => {
                    transition(&mut status, RunStatus::Failed);
                    log_run_error(&e);
                    return Err(e);
                }
            };
            log_node_complete(&current, commands.len());

            // Merge all-or-nothing: stage onto a copy, commit only when every
            // Command of the step applied cleanly.
            let step_update = match self.merge_step(state, &commands) {
                Ok(update) => update,
                Err(e) => {
                    transition(&mut status, RunStatus::Failed);
                    log_run_error(&e);
                    return Err(e);
                }
            };
            log_state_update(&current, step_update.len());
            self.emit_step_events(tx, modes, &current, step_update, state)
                .await;

            step += 1;
            match self.next_node(&current, &commands) {
                None => {
                    transition(&mut status, RunStatus::Terminated);
                    log_run_complete(step);
                    return Ok(());
                }
                Some(next) => {
                    if !self.nodes.contains_key(&next) {
                        transition(&mut status, RunStatus::Failed);
                        let e = GraphError::UnknownNode(next);
                        log_run_error(&e);
                        return Err(e);
                    }
                    current = next;
                }
            }
        }
    }

    /// Applies every Command of a step in production order, all-or-nothing.
    /// Returns the step's combined update for observers.
    fn merge_step(
        &self,
        state: &mut StateValues,
        commands: &[Command],
    ) -> Result<StateUpdate, GraphError> {
        let mut staged = state.clone();
        let mut step_update = StateUpdate::new();
        for command in commands {
            self.schema.apply(&mut staged, &command.update)?;
            self.schema.combine(&mut step_update, &command.update)?;
        }
        *state = staged;
        Ok(step_update)
    }

    async fn emit_step_events(
        &self,
        tx: Option<&mpsc::Sender<RunEvent>>,
        modes: &HashSet<StreamMode>,
        node: &str,
        update: StateUpdate,
        state: &StateValues,
    ) {
        let Some(tx) = tx else { return };
        if modes.contains(&StreamMode::Updates) {
            let _ = tx
                .send(RunEvent::Updates {
                    node: node.to_string(),
                    update,
                })
                .await;
        }
        if modes.contains(&StreamMode::Values) {
            let _ = tx
                .send(RunEvent::Values {
                    state: state.clone(),
                })
                .await;
        }
    }

    /// Resolves the next node: the last Command's directive wins; with no
    /// directive the static default edge is followed; no edge means terminal.
    fn next_node(&self, current: &str, commands: &[Command]) -> Option<String> {
        let directive = commands.iter().rev().find_map(|c| c.goto.clone());
        match directive {
            Some(Goto::End) => None,
            Some(Goto::Node(id)) if id == END => None,
            Some(Goto::Node(id)) => Some(id),
            None => self
                .edges
                .get(current)
                .filter(|target| target.as_str() != END)
                .cloned(),
        }
    }
}

fn transition(status: &mut RunStatus, to: RunStatus) {
    tracing::trace!(from = ?status, to = ?to, "run status");
    *status = to;
}
