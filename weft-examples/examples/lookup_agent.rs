//! Agent loop demo: a tool updates shared state and appends a message in one
//! Command; the next turn's prompt sees the merged state.
//!
//! Run with: `cargo run --example lookup_agent`
//! (set RUST_LOG=debug for executor logs)

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio_stream::StreamExt;

use weft::{
    agent_schema, AgentBuilder, Command, FnTool, Message, ModelResponse, Reducer, RunConfig,
    RunEvent, ScriptedModel, StateValues, StreamMode, ToolCall, ToolOutput, ToolRegistry,
    MESSAGES_KEY,
};

/// Prompt: a system message carrying whatever `user_info` holds right now,
/// followed by the conversation.
fn prompt(state: &StateValues) -> Value {
    let user_info = state
        .get("user_info")
        .map(|v| v.to_string())
        .unwrap_or_else(|| "none".to_string());
    let mut messages = vec![Message::system(format!("Known user info: {user_info}"))];
    if let Some(Value::Array(values)) = state.get(MESSAGES_KEY) {
        messages.extend(weft::messages_from_values(values));
    }
    serde_json::to_value(&messages).unwrap_or(Value::Null)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // The lookup tool reads the caller identity from the run configuration
    // and returns an explicit Command: a user_info update plus a
    // result-message, merged in one step.
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(
        FnTool::new("lookup", |_args, ctx| {
            let user_id = ctx.require_config("user_id")?;
            Ok(ToolOutput::Command(
                Command::new()
                    .with_update("user_info", json!({"id": user_id, "name": "Bob"}))
                    .with_update(
                        MESSAGES_KEY,
                        json!([
                            Message::tool_result(&ctx.call_id, "lookup", "looked up").to_value()
                        ]),
                    ),
            ))
        })
        .with_description("Look up the current user's record"),
    ));

    // Stand-in for a real model: first turn requests the lookup, second turn
    // answers from the (now merged) user info in its prompt.
    let model = Arc::new(ScriptedModel::new(vec![
        ModelResponse::with_calls(
            "let me look you up",
            vec![ToolCall::new("call-1", "lookup", json!({}))],
        ),
        ModelResponse::text("Hello Bob, good to see you!"),
    ]));

    let graph = AgentBuilder::new(model, Arc::new(registry))
        .with_schema(agent_schema().field("user_info", Reducer::ShallowMerge))
        .with_prompt(prompt)
        .build()?;

    let mut initial = StateValues::new();
    initial.insert(MESSAGES_KEY.into(), json!([Message::user("hi").to_value()]));
    let config = RunConfig::new()
        .with_run_id("lookup-demo")
        .with_value("user_id", "u-42");

    let mut stream = graph.stream(initial, config, HashSet::from_iter([StreamMode::Updates]));
    while let Some(event) = stream.next().await {
        if let RunEvent::Updates { node, update } = event {
            println!("[{node}] contributed: {}", Value::Object(update));
        }
    }

    Ok(())
}
