//! Plain state-graph demo, no model involved: three nodes chained by default
//! edges, each contributing a Command merged under the schema's reducers.
//!
//! Run with: `cargo run --example state_graph_pipeline`

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use weft::{
    Command, GraphError, Node, Reducer, RunConfig, StateGraph, StateSchema, StateValues,
    StepContext, END, START,
};

/// Appends one entry to the pipeline log and stamps the current stage.
struct StageNode {
    id: &'static str,
}

#[async_trait]
impl Node for StageNode {
    fn id(&self) -> &str {
        self.id
    }

    async fn run(
        &self,
        _state: &StateValues,
        ctx: &StepContext<'_>,
    ) -> Result<Vec<Command>, GraphError> {
        Ok(vec![Command::new()
            .with_update("log", json!([format!("{} ran at step {}", self.id, ctx.step)]))
            .with_update("stage", json!(self.id))])
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let schema = StateSchema::new()
        .field_with_default("log", Reducer::Append, json!([]))
        .field("stage", Reducer::Replace);

    let mut graph = StateGraph::new(schema);
    graph.add_node("extract", Arc::new(StageNode { id: "extract" }));
    graph.add_node("transform", Arc::new(StageNode { id: "transform" }));
    graph.add_node("load", Arc::new(StageNode { id: "load" }));
    graph.add_edge(START, "extract");
    graph.add_edge("extract", "transform");
    graph.add_edge("transform", "load");
    graph.add_edge("load", END);
    let compiled = graph.compile()?;

    let out = compiled.invoke(StateValues::new(), RunConfig::new()).await?;
    println!("final stage: {}", out["stage"]);
    for entry in out["log"].as_array().into_iter().flatten() {
        println!("  {entry}");
    }
    Ok(())
}
