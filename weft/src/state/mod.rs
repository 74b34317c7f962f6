//! Typed state for graph runs: a field map plus per-field reduction rules.
//!
//! [`StateValues`] is the authoritative per-run mapping from field name to
//! JSON value; [`StateSchema`] declares which fields exist and how proposed
//! updates fold into current values ([`Reducer`]). Exactly one `StateValues`
//! instance exists per run; nodes never mutate it directly, they return
//! Commands that the executor merges through the schema.

mod schema;

pub use schema::{Reducer, SchemaViolation, StateSchema};

use serde_json::{Map, Value};

/// The authoritative state of one run: field name → value.
pub type StateValues = Map<String, Value>;

/// A partial state update proposed by a Command: field name → proposed value.
pub type StateUpdate = Map<String, Value>;

/// Conventional name of the conversation-history field.
///
/// Tool result-messages are appended here; the field is expected to use
/// [`Reducer::Append`].
pub const MESSAGES_KEY: &str = "messages";
