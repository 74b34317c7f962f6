//! State schema: declared fields, reduction rules, and the merge contract.
//!
//! `apply` folds one update into the state; `combine` folds one update into
//! another (used to aggregate per-call Commands into a single step update).
//! Both are pure over their inputs and total for schema-declared,
//! shape-valid updates; anything else is a [`SchemaViolation`].

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;

use super::{StateUpdate, StateValues};

/// Per-field reduction rule: how a proposed value folds into the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    /// New value wins.
    Replace,
    /// Current and new are ordered sequences; result is current ++ new.
    /// Not idempotent: applying the same update twice appends two copies.
    Append,
    /// Current and new are key-value mappings; new keys overwrite, others
    /// are preserved.
    ShallowMerge,
}

/// Violation of the state schema contract. Fatal to the step; the run
/// transitions to Failed with the pre-step state preserved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    /// The update references a field the schema does not declare.
    #[error("update references undeclared field '{0}'")]
    UnknownField(String),
    /// An `append` field saw a non-array value.
    #[error("field '{field}' reduces by append but the {side} value is not an array")]
    NotAnArray {
        field: String,
        /// Which side had the wrong shape: "current" or "update".
        side: &'static str,
    },
    /// A `shallow-merge` field saw a non-object value.
    #[error("field '{field}' reduces by shallow-merge but the {side} value is not an object")]
    NotAnObject { field: String, side: &'static str },
}

#[derive(Debug, Clone)]
struct FieldSpec {
    reducer: Reducer,
    default: Option<Value>,
}

/// Declares the fields of a run's state and their reduction rules.
///
/// Built once per graph; consulted by the executor on every merge. Fields
/// absent from an update keep their prior value (the reduction rule is never
/// applied for them).
///
/// **Interaction**: Owned by `StateGraph`/`CompiledGraph`; exposed to nodes
/// through `StepContext` so the tool-dispatch node can aggregate per-call
/// Commands under the same rules the executor merges with.
#[derive(Debug, Clone, Default)]
pub struct StateSchema {
    fields: HashMap<String, FieldSpec>,
}

impl StateSchema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field with a reduction rule and no default.
    pub fn field(mut self, name: impl Into<String>, reducer: Reducer) -> Self {
        self.fields.insert(
            name.into(),
            FieldSpec {
                reducer,
                default: None,
            },
        );
        self
    }

    /// Declares a field with a reduction rule and a default value seeded at
    /// run start when the initial state leaves the field absent.
    pub fn field_with_default(
        mut self,
        name: impl Into<String>,
        reducer: Reducer,
        default: Value,
    ) -> Self {
        self.fields.insert(
            name.into(),
            FieldSpec {
                reducer,
                default: Some(default),
            },
        );
        self
    }

    /// True when the schema declares the field.
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// The declared reduction rule for a field, if any.
    pub fn reducer(&self, name: &str) -> Option<Reducer> {
        self.fields.get(name).map(|spec| spec.reducer)
    }

    /// Fills absent fields from declared defaults. Fields without a default
    /// stay absent; reducers treat an absent current value as the identity.
    pub fn seed(&self, state: &mut StateValues) {
        for (name, spec) in &self.fields {
            if let Some(default) = &spec.default {
                if !state.contains_key(name) {
                    state.insert(name.clone(), default.clone());
                }
            }
        }
    }

    /// Folds `update` into `state`, field by field, under each field's rule.
    ///
    /// Pure over its inputs: on error `state` may be partially written, so
    /// callers that need all-or-nothing semantics stage onto a copy (the
    /// executor does exactly that per step).
    pub fn apply(
        &self,
        state: &mut StateValues,
        update: &StateUpdate,
    ) -> Result<(), SchemaViolation> {
        for (name, proposed) in update {
            let spec = self
                .fields
                .get(name)
                .ok_or_else(|| SchemaViolation::UnknownField(name.clone()))?;
            match spec.reducer {
                Reducer::Replace => {
                    state.insert(name.clone(), proposed.clone());
                }
                Reducer::Append => {
                    let addition = as_array(name, proposed, "update")?;
                    match state.get_mut(name) {
                        None => {
                            state.insert(name.clone(), Value::Array(addition.to_vec()));
                        }
                        Some(current) => {
                            let items = match current {
                                Value::Array(items) => items,
                                _ => {
                                    return Err(SchemaViolation::NotAnArray {
                                        field: name.clone(),
                                        side: "current",
                                    })
                                }
                            };
                            items.extend(addition.iter().cloned());
                        }
                    }
                }
                Reducer::ShallowMerge => {
                    let addition = as_object(name, proposed, "update")?;
                    match state.get_mut(name) {
                        None => {
                            state.insert(name.clone(), Value::Object(addition.clone()));
                        }
                        Some(current) => {
                            let entries = match current {
                                Value::Object(entries) => entries,
                                _ => {
                                    return Err(SchemaViolation::NotAnObject {
                                        field: name.clone(),
                                        side: "current",
                                    })
                                }
                            };
                            for (key, value) in addition {
                                entries.insert(key.clone(), value.clone());
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Folds `update` into the accumulator `into` under the same rules.
    ///
    /// Combining U1 then U2 into an empty accumulator and applying the result
    /// once is equivalent to applying U1 then U2 sequentially; the
    /// tool-dispatch node relies on this to aggregate per-call Commands into
    /// one step update.
    pub fn combine(
        &self,
        into: &mut StateUpdate,
        update: &StateUpdate,
    ) -> Result<(), SchemaViolation> {
        self.apply(into, update)
    }
}

fn as_array<'a>(
    field: &str,
    value: &'a Value,
    side: &'static str,
) -> Result<&'a Vec<Value>, SchemaViolation> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(SchemaViolation::NotAnArray {
            field: field.to_string(),
            side,
        }),
    }
}

fn as_object<'a>(
    field: &str,
    value: &'a Value,
    side: &'static str,
) -> Result<&'a serde_json::Map<String, Value>, SchemaViolation> {
    match value {
        Value::Object(entries) => Ok(entries),
        _ => Err(SchemaViolation::NotAnObject {
            field: field.to_string(),
            side,
        }),
    }
}
