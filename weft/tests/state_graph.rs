//! Integration tests for the executor: routing, merging, failure handling,
//! dynamic-input recomputation, streaming, step limit, cancellation.


use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use weft::{
    Command, GraphError, Node, Reducer, RunConfig, RunEvent, StateGraph, StateSchema, StateValues,
    StepContext, StreamMode, END, START,
};

fn log_schema() -> StateSchema {
    StateSchema::new()
        .field_with_default("log", Reducer::Append, json!([]))
        .field("mode", Reducer::Replace)
        .field("user_info", Reducer::ShallowMerge)
}

/// Node that returns a fixed list of Commands.
struct FixedNode {
    id: &'static str,
    commands: Vec<Command>,
}

#[async_trait]
impl Node for FixedNode {
    fn id(&self) -> &str {
        self.id
    }
    async fn run(
        &self,
        _state: &StateValues,
        _ctx: &StepContext<'_>,
    ) -> Result<Vec<Command>, GraphError> {
        Ok(self.commands.clone())
    }
}

fn tag_node(id: &'static str, tag: &str) -> Arc<FixedNode> {
    Arc::new(FixedNode {
        id,
        commands: vec![Command::new().with_update("log", json!([tag]))],
    })
}

/// **Scenario**: A Command's goto overrides the default edge; the skipped
/// node never runs.
#[tokio::test]
async fn goto_overrides_default_edge() {
    let mut graph = StateGraph::new(log_schema());
    graph.add_node(
        "first",
        Arc::new(FixedNode {
            id: "first",
            commands: vec![Command::new()
                .with_update("log", json!(["first"]))
                .with_goto("third")],
        }),
    );
    graph.add_node("second", tag_node("second", "second"));
    graph.add_node("third", tag_node("third", "third"));
    graph.add_edge(START, "first");
    graph.add_edge("first", "second");
    graph.add_edge("second", "third");
    graph.add_edge("third", END);
    let compiled = graph.compile().expect("graph compiles");

    let out = compiled
        .invoke(StateValues::new(), RunConfig::new())
        .await
        .unwrap();
    assert_eq!(out["log"], json!(["first", "third"]));
}

/// **Scenario**: Goto End terminates even when a default edge exists.
#[tokio::test]
async fn goto_end_terminates_early() {
    let mut graph = StateGraph::new(log_schema());
    graph.add_node(
        "first",
        Arc::new(FixedNode {
            id: "first",
            commands: vec![Command::new().with_update("log", json!(["first"])).end()],
        }),
    );
    graph.add_node("second", tag_node("second", "second"));
    graph.add_edge(START, "first");
    graph.add_edge("first", "second");
    let compiled = graph.compile().expect("graph compiles");

    let out = compiled
        .invoke(StateValues::new(), RunConfig::new())
        .await
        .unwrap();
    assert_eq!(out["log"], json!(["first"]));
}

/// **Scenario**: Multiple Commands from one step merge in production order
/// and the last directive wins.
#[tokio::test]
async fn multiple_commands_merge_in_order_last_goto_wins() {
    let mut graph = StateGraph::new(log_schema());
    graph.add_node(
        "multi",
        Arc::new(FixedNode {
            id: "multi",
            commands: vec![
                Command::new().with_update("log", json!(["one"])).end(),
                Command::new()
                    .with_update("log", json!(["two"]))
                    .with_goto("tail"),
            ],
        }),
    );
    graph.add_node("tail", tag_node("tail", "tail"));
    graph.add_edge(START, "multi");
    graph.add_edge("tail", END);
    let compiled = graph.compile().expect("graph compiles");

    let out = compiled
        .invoke(StateValues::new(), RunConfig::new())
        .await
        .unwrap();
    // Both updates merged; the later with_goto("tail") overrode the earlier End.
    assert_eq!(out["log"], json!(["one", "two", "tail"]));
}

/// **Scenario**: An update naming an undeclared field fails the run with a
/// SchemaViolation; the state as of the last successful merge is retrievable.
#[tokio::test]
async fn schema_violation_fails_run_preserving_state() {
    let mut graph = StateGraph::new(log_schema());
    graph.add_node("good", tag_node("good", "good"));
    graph.add_node(
        "bad",
        Arc::new(FixedNode {
            id: "bad",
            commands: vec![Command::new().with_update("unknown_field", json!(1))],
        }),
    );
    graph.add_edge(START, "good");
    graph.add_edge("good", "bad");
    let compiled = graph.compile().expect("graph compiles");

    let failure = compiled
        .invoke(StateValues::new(), RunConfig::new())
        .await
        .unwrap_err();
    assert!(matches!(failure.error, GraphError::Schema(_)));
    assert_eq!(
        failure.state["log"],
        json!(["good"]),
        "state of the last successful merge is preserved"
    );
}

/// **Scenario**: A step whose merge fails applies none of the step's
/// Commands, even when an earlier Command of the same step was valid.
#[tokio::test]
async fn failed_step_merge_is_all_or_nothing() {
    let mut graph = StateGraph::new(log_schema());
    graph.add_node(
        "half",
        Arc::new(FixedNode {
            id: "half",
            commands: vec![
                Command::new().with_update("log", json!(["kept?"])),
                Command::new().with_update("unknown_field", json!(1)),
            ],
        }),
    );
    graph.add_edge(START, "half");
    let compiled = graph.compile().expect("graph compiles");

    let failure = compiled
        .invoke(StateValues::new(), RunConfig::new())
        .await
        .unwrap_err();
    assert_eq!(
        failure.state["log"],
        json!([]),
        "no partial merge from the failed step"
    );
}

/// **Scenario**: A node error fails the run and surfaces the node id.
#[tokio::test]
async fn node_error_fails_run() {
    struct FailingNode;

    #[async_trait]
    impl Node for FailingNode {
        fn id(&self) -> &str {
            "failing"
        }
        async fn run(
            &self,
            _state: &StateValues,
            _ctx: &StepContext<'_>,
        ) -> Result<Vec<Command>, GraphError> {
            Err(GraphError::node_failed("failing", "deliberate"))
        }
    }

    let mut graph = StateGraph::new(log_schema());
    graph.add_node("failing", Arc::new(FailingNode));
    graph.add_edge(START, "failing");
    let compiled = graph.compile().expect("graph compiles");

    let failure = compiled
        .invoke(StateValues::new(), RunConfig::new())
        .await
        .unwrap_err();
    match failure.error {
        GraphError::NodeFailed { node, message } => {
            assert_eq!(node, "failing");
            assert!(message.contains("deliberate"));
        }
        other => panic!("expected NodeFailed, got {:?}", other),
    }
}

/// **Scenario**: A goto naming a node the graph does not have fails the run.
#[tokio::test]
async fn goto_unknown_node_fails_run() {
    let mut graph = StateGraph::new(log_schema());
    graph.add_node(
        "first",
        Arc::new(FixedNode {
            id: "first",
            commands: vec![Command::new().with_goto("ghost")],
        }),
    );
    graph.add_edge(START, "first");
    let compiled = graph.compile().expect("graph compiles");

    let failure = compiled
        .invoke(StateValues::new(), RunConfig::new())
        .await
        .unwrap_err();
    assert!(matches!(failure.error, GraphError::UnknownNode(name) if name == "ghost"));
}

/// **Scenario**: A self-looping node hits the step limit.
#[tokio::test]
async fn step_limit_stops_looping_run() {
    let mut graph = StateGraph::new(log_schema()).with_step_limit(3);
    graph.add_node(
        "looper",
        Arc::new(FixedNode {
            id: "looper",
            commands: vec![Command::new()
                .with_update("log", json!(["tick"]))
                .with_goto("looper")],
        }),
    );
    graph.add_edge(START, "looper");
    let compiled = graph.compile().expect("graph compiles");

    let failure = compiled
        .invoke(StateValues::new(), RunConfig::new())
        .await
        .unwrap_err();
    assert!(matches!(failure.error, GraphError::StepLimitExceeded(3)));
    assert_eq!(failure.state["log"], json!(["tick", "tick", "tick"]));
}

/// **Scenario**: A cancelled token stops the run at the step boundary; the
/// already-committed state is preserved.
#[tokio::test]
async fn cancellation_between_steps() {
    let token = CancellationToken::new();
    let cancel_after_first = token.clone();

    struct CancellingNode {
        token: CancellationToken,
    }

    #[async_trait]
    impl Node for CancellingNode {
        fn id(&self) -> &str {
            "canceller"
        }
        async fn run(
            &self,
            _state: &StateValues,
            _ctx: &StepContext<'_>,
        ) -> Result<Vec<Command>, GraphError> {
            self.token.cancel();
            Ok(vec![Command::new()
                .with_update("log", json!(["ran"]))
                .with_goto("never")])
        }
    }

    let mut graph = StateGraph::new(log_schema());
    graph.add_node(
        "canceller",
        Arc::new(CancellingNode {
            token: cancel_after_first,
        }),
    );
    graph.add_node("never", tag_node("never", "never"));
    graph.add_edge(START, "canceller");
    let compiled = graph.compile().expect("graph compiles");

    let config = RunConfig::new().with_cancellation(token);
    let failure = compiled
        .invoke(StateValues::new(), config)
        .await
        .unwrap_err();
    assert!(matches!(failure.error, GraphError::Cancelled));
    assert_eq!(
        failure.state["log"],
        json!(["ran"]),
        "the completed step's merge is kept; the next node never ran"
    );
}

/// Reader node that records its derived input and replays queued Commands.
struct RoutingReader {
    seen: Arc<Mutex<Vec<Option<Value>>>>,
    commands: Mutex<Vec<Command>>,
}

#[async_trait]
impl Node for RoutingReader {
    fn id(&self) -> &str {
        "reader"
    }
    async fn run(
        &self,
        _state: &StateValues,
        ctx: &StepContext<'_>,
    ) -> Result<Vec<Command>, GraphError> {
        self.seen
            .lock()
            .unwrap()
            .push(ctx.derived_input().cloned());
        Ok(vec![self.commands.lock().unwrap().remove(0)])
    }
}

/// **Scenario**: A dynamic-input function runs against the post-merge state
/// of the previous step: the writer node's update in step K is visible to
/// the reader's input function at step K+1, and absent before it.
#[tokio::test]
async fn dynamic_input_sees_previous_steps_merge() {
    // reader (sees nothing) -> writer (updates user_info) -> reader again.
    let seen = Arc::new(Mutex::new(vec![]));
    let mut graph = StateGraph::new(log_schema());
    graph.add_node_with_input(
        "reader",
        Arc::new(RoutingReader {
            seen: seen.clone(),
            commands: Mutex::new(vec![
                Command::new().with_goto("writer"),
                Command::new().end(),
            ]),
        }),
        Arc::new(|state: &StateValues| state.get("user_info").cloned().unwrap_or(Value::Null)),
    );
    graph.add_node(
        "writer",
        Arc::new(FixedNode {
            id: "writer",
            commands: vec![Command::new().with_update("user_info", json!({"name": "Bob"}))],
        }),
    );
    graph.add_edge(START, "reader");
    graph.add_edge("writer", "reader");
    let compiled = graph.compile().expect("graph compiles");

    compiled
        .invoke(StateValues::new(), RunConfig::new())
        .await
        .unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2, "reader ran twice");
    assert_eq!(seen[0], Some(Value::Null), "step K: update not yet visible");
    assert_eq!(
        seen[1],
        Some(json!({"name": "Bob"})),
        "step K+1: previous step's merge is visible"
    );
}

/// **Scenario**: stream(Updates) emits one event per completed step carrying
/// only that step's update fields, keyed by node.
#[tokio::test]
async fn stream_updates_carry_step_contribution_only() {
    let mut graph = StateGraph::new(log_schema());
    graph.add_node(
        "first",
        Arc::new(FixedNode {
            id: "first",
            commands: vec![Command::new()
                .with_update("log", json!(["a"]))
                .with_update("mode", json!("plan"))],
        }),
    );
    graph.add_node("second", tag_node("second", "b"));
    graph.add_edge(START, "first");
    graph.add_edge("first", "second");
    graph.add_edge("second", END);
    let compiled = graph.compile().expect("graph compiles");

    let stream = compiled.stream(
        StateValues::new(),
        RunConfig::new(),
        HashSet::from_iter([StreamMode::Updates]),
    );
    let events: Vec<_> = stream.collect().await;
    assert_eq!(events.len(), 2);
    match &events[0] {
        RunEvent::Updates { node, update } => {
            assert_eq!(node, "first");
            assert_eq!(update.len(), 2);
            assert_eq!(update["log"], json!(["a"]));
            assert_eq!(update["mode"], json!("plan"));
        }
        other => panic!("expected Updates, got {:?}", other),
    }
    match &events[1] {
        RunEvent::Updates { node, update } => {
            assert_eq!(node, "second");
            assert_eq!(update["log"], json!(["b"]));
            assert!(!update.contains_key("mode"), "update fields only");
        }
        other => panic!("expected Updates, got {:?}", other),
    }
}

/// **Scenario**: stream(Values) emits full post-merge snapshots; the last
/// one is the final state.
#[tokio::test]
async fn stream_values_emit_snapshots() {
    let mut graph = StateGraph::new(log_schema());
    graph.add_node("first", tag_node("first", "a"));
    graph.add_node("second", tag_node("second", "b"));
    graph.add_edge(START, "first");
    graph.add_edge("first", "second");
    graph.add_edge("second", END);
    let compiled = graph.compile().expect("graph compiles");

    let stream = compiled.stream(
        StateValues::new(),
        RunConfig::new(),
        HashSet::from_iter([StreamMode::Values]),
    );
    let events: Vec<_> = stream.collect().await;
    assert_eq!(events.len(), 2);
    assert!(
        matches!(&events[1], RunEvent::Values { state } if state["log"] == json!(["a", "b"]))
    );
}

/// **Scenario**: Schema defaults seed the initial state before the first
/// step; a caller-provided value wins over the default.
#[tokio::test]
async fn defaults_seed_initial_state() {
    struct EchoLog;

    #[async_trait]
    impl Node for EchoLog {
        fn id(&self) -> &str {
            "echo"
        }
        async fn run(
            &self,
            state: &StateValues,
            _ctx: &StepContext<'_>,
        ) -> Result<Vec<Command>, GraphError> {
            // The seeded default makes `log` an array even for an empty
            // initial state.
            assert!(state["log"].is_array());
            Ok(vec![])
        }
    }

    let mut graph = StateGraph::new(log_schema());
    graph.add_node("echo", Arc::new(EchoLog));
    graph.add_edge(START, "echo");
    let compiled = graph.compile().expect("graph compiles");

    let out = compiled
        .invoke(StateValues::new(), RunConfig::new())
        .await
        .unwrap();
    assert_eq!(out["log"], json!([]));

    let mut preset = StateValues::new();
    preset.insert("log".into(), json!(["kept"]));
    let out = compiled.invoke(preset, RunConfig::new()).await.unwrap();
    assert_eq!(out["log"], json!(["kept"]));
}
