//! Prebuilt decision/tool loop: model node + dispatch node wired together.
//!
//! `AgentBuilder` produces the common two-node loop: the model decides,
//! requested tools execute and merge their Commands, the model sees the
//! post-merge state on the next turn (through its dynamic prompt when one is
//! given), until a reply with no tool calls ends the run.

use std::sync::Arc;

use serde_json::json;
use serde_json::Value;

use crate::graph::{CompilationError, CompiledGraph, StateGraph, START};
use crate::model::{ChatModel, ModelNode, MODEL_NODE};
use crate::state::{Reducer, StateSchema, StateValues, MESSAGES_KEY};
use crate::tool::{ToolDispatchNode, ToolRegistry, TOOL_DISPATCH_NODE};

/// The default agent schema: a `messages` field reduced by append, seeded
/// with an empty list. Callers extend it with their own fields before
/// passing it to [`AgentBuilder::with_schema`].
pub fn agent_schema() -> StateSchema {
    StateSchema::new().field_with_default(MESSAGES_KEY, Reducer::Append, json!([]))
}

/// Builder for the model ↔ tools loop.
///
/// **Interaction**: Combines [`ModelNode`] and [`ToolDispatchNode`] into a
/// [`CompiledGraph`]; the optional prompt function is registered as the
/// model node's dynamic input, so it always observes the post-merge state of
/// the previous step.
pub struct AgentBuilder {
    model: Arc<dyn ChatModel>,
    registry: Arc<ToolRegistry>,
    prompt: Option<crate::graph::DynamicInputFn>,
    schema: Option<StateSchema>,
    step_limit: Option<u32>,
}

impl AgentBuilder {
    /// Creates a builder over a model and a tool registry.
    pub fn new(model: Arc<dyn ChatModel>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            model,
            registry,
            prompt: None,
            schema: None,
            step_limit: None,
        }
    }

    /// Registers a prompt function, recomputed from the current state before
    /// every model turn. It must return a JSON-encoded message list.
    pub fn with_prompt(
        mut self,
        prompt: impl Fn(&StateValues) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.prompt = Some(Arc::new(prompt));
        self
    }

    /// Replaces the default [`agent_schema`] (e.g. to add tool-written
    /// fields). The schema must keep a `messages` append field.
    pub fn with_schema(mut self, schema: StateSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Overrides the run step limit.
    pub fn with_step_limit(mut self, limit: u32) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Wires and compiles the two-node loop.
    pub fn build(self) -> Result<CompiledGraph, CompilationError> {
        let schema = self.schema.unwrap_or_else(agent_schema);
        let specs = self.registry.list();
        let model_node = Arc::new(ModelNode::new(self.model, specs));
        let dispatch_node = Arc::new(ToolDispatchNode::new(self.registry));

        let mut graph = StateGraph::new(schema);
        if let Some(limit) = self.step_limit {
            graph = graph.with_step_limit(limit);
        }
        match self.prompt {
            Some(prompt) => {
                graph.add_node_with_input(MODEL_NODE, model_node, prompt);
            }
            None => {
                graph.add_node(MODEL_NODE, model_node);
            }
        }
        graph.add_node(TOOL_DISPATCH_NODE, dispatch_node);
        graph.add_edge(START, MODEL_NODE);
        graph.add_edge(TOOL_DISPATCH_NODE, MODEL_NODE);
        graph.compile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelResponse, ScriptedModel};

    /// **Scenario**: The builder compiles with and without a prompt function.
    #[test]
    fn agent_builder_compiles() {
        let model = Arc::new(ScriptedModel::new(vec![ModelResponse::text("done")]));
        let registry = Arc::new(ToolRegistry::new());
        assert!(AgentBuilder::new(model.clone(), registry.clone())
            .build()
            .is_ok());
        assert!(AgentBuilder::new(model, registry)
            .with_prompt(|_state| json!([]))
            .with_step_limit(5)
            .build()
            .is_ok());
    }

    /// **Scenario**: agent_schema declares an appending messages field with a
    /// list default.
    #[test]
    fn agent_schema_declares_messages() {
        let schema = agent_schema();
        assert_eq!(schema.reducer(MESSAGES_KEY), Some(Reducer::Append));
        let mut state = StateValues::new();
        schema.seed(&mut state);
        assert_eq!(state[MESSAGES_KEY], json!([]));
    }
}
