//! Tool-dispatch node: execute the pending tool calls, aggregate Commands.
//!
//! Reads the trailing assistant message's tool calls from the messages field,
//! runs every call concurrently, and folds the per-call Commands into one
//! combined Command in request order. Tool-level errors (unknown name,
//! domain error, missing configuration) become error result-messages; one
//! failing call never blocks its siblings.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Tool, ToolCallContext, ToolError, ToolOutput, ToolRegistry};
use crate::command::Command;
use crate::error::GraphError;
use crate::graph::{Node, StepContext};
use crate::message::{Message, ToolCall};
use crate::state::{StateValues, MESSAGES_KEY};

/// Default id of the dispatch node in a graph.
pub const TOOL_DISPATCH_NODE: &str = "tools";

/// Node that executes tool-call requests and aggregates their Commands.
///
/// Requests come from the trailing assistant message in the messages field;
/// they are consumed exactly once (the next decision step produces fresh
/// ones). All calls of a step may run concurrently; results are aggregated
/// in request order regardless of completion order, so observers see a
/// deterministic message sequence.
pub struct ToolDispatchNode {
    registry: Arc<ToolRegistry>,
    messages_key: String,
}

impl ToolDispatchNode {
    /// Creates a dispatch node over the given registry.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            messages_key: MESSAGES_KEY.to_string(),
        }
    }

    /// Overrides the state field the node reads requests from and appends
    /// result-messages to (default [`MESSAGES_KEY`]).
    pub fn with_messages_key(mut self, key: impl Into<String>) -> Self {
        self.messages_key = key.into();
        self
    }

    /// Tool calls of the last message, when it is an assistant message.
    ///
    /// Only the literal last message counts: once result-messages are
    /// appended behind it, re-running the node re-dispatches nothing, which
    /// keeps every request consumed exactly once.
    fn pending_calls(&self, state: &StateValues) -> Vec<ToolCall> {
        let Some(Value::Array(values)) = state.get(&self.messages_key) else {
            return vec![];
        };
        match values.last().and_then(Message::from_value) {
            Some(Message::Assistant { tool_calls, .. }) => tool_calls,
            _ => vec![],
        }
    }

    /// Executes one call and produces its Command. Tool-level failures are
    /// folded into an error result-message, never returned as errors.
    async fn execute_call(&self, call: &ToolCall, config: &crate::config::RunConfig) -> Command {
        let ctx = ToolCallContext {
            call_id: call.id.clone(),
            tool_name: call.name.clone(),
            config: config.clone(),
        };

        let Some(tool) = self.registry.get(&call.name) else {
            warn!(tool = %call.name, call_id = %call.id, "Tool not found");
            return self.result_message_command(Message::tool_error(
                &call.id,
                &call.name,
                format!("Error: {}", ToolError::NotFound(call.name.clone())),
            ));
        };

        debug!(tool = %call.name, call_id = %call.id, "Calling tool");
        match tool.call(call.arguments.clone(), &ctx).await {
            Ok(ToolOutput::Value(value)) => self.result_message_command(Message::tool_result(
                &call.id,
                &call.name,
                value_to_text(&value),
            )),
            Ok(ToolOutput::Command(command)) => self.ensure_linked(command, call),
            Err(e) => {
                warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool call failed");
                self.result_message_command(Message::tool_error(
                    &call.id,
                    &call.name,
                    format!("Error: {e}"),
                ))
            }
        }
    }

    /// Default Command for a plain result: append one result-message.
    fn result_message_command(&self, message: Message) -> Command {
        Command::new().with_update(
            self.messages_key.clone(),
            Value::Array(vec![message.to_value()]),
        )
    }

    /// Guarantees an explicit tool Command stays observably linked to its
    /// call: when its messages update carries no result-message for the call
    /// id, a confirmation message is appended. A non-array messages update is
    /// left untouched for the schema to reject at merge time.
    fn ensure_linked(&self, mut command: Command, call: &ToolCall) -> Command {
        match command.update.get_mut(&self.messages_key) {
            None => {
                command.update.insert(
                    self.messages_key.clone(),
                    Value::Array(vec![Message::tool_result(
                        &call.id,
                        &call.name,
                        format!("{} completed.", call.name),
                    )
                    .to_value()]),
                );
            }
            Some(Value::Array(items)) => {
                let linked = items.iter().any(|item| {
                    item.get("call_id").and_then(Value::as_str) == Some(call.id.as_str())
                });
                if !linked {
                    items.push(
                        Message::tool_result(
                            &call.id,
                            &call.name,
                            format!("{} completed.", call.name),
                        )
                        .to_value(),
                    );
                }
            }
            Some(_) => {}
        }
        command
    }
}

#[async_trait]
impl Node for ToolDispatchNode {
    fn id(&self) -> &str {
        TOOL_DISPATCH_NODE
    }

    async fn run(
        &self,
        state: &StateValues,
        ctx: &StepContext<'_>,
    ) -> Result<Vec<Command>, GraphError> {
        let calls = self.pending_calls(state);
        if calls.is_empty() {
            return Ok(vec![]);
        }

        // Calls are read-only over the pre-step state and independent, so
        // they run concurrently; join_all returns results in request order,
        // which fixes the merge order regardless of completion order.
        let commands = join_all(
            calls
                .iter()
                .map(|call| self.execute_call(call, ctx.config)),
        )
        .await;

        // Fold the per-call Commands into one combined Command for the step.
        // The last per-call directive wins; every update is merged.
        let mut combined = Command::new();
        for command in commands {
            ctx.schema.combine(&mut combined.update, &command.update)?;
            if command.goto.is_some() {
                combined.goto = command.goto;
            }
        }
        Ok(vec![combined])
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
