//! Run configuration: an opaque key-value bag passed at run start.
//!
//! Readable by tools via [`ToolCallContext`](crate::tool::ToolCallContext),
//! never mutated by the executor. Also carries an optional cancellation token
//! honored at step boundaries.

use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

/// Configuration for one run.
///
/// `values` is opaque to the executor; tools read keys they care about (e.g.
/// a caller identity used to select records). Cancellation is cooperative:
/// the executor checks the token between steps only, so a partially-completed
/// step never applies a partial merge.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Optional caller-supplied run identifier, used only for logging.
    pub run_id: Option<String>,
    values: Map<String, Value>,
    cancellation: Option<CancellationToken>,
}

impl RunConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the run identifier.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// Adds one configuration value.
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Attaches a cancellation token checked between steps.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Reads a configuration value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns true when a cancellation token is attached and cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map_or(false, CancellationToken::is_cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Values set with with_value are readable; unknown keys are None.
    #[test]
    fn run_config_get_values() {
        let config = RunConfig::new()
            .with_run_id("run-1")
            .with_value("user_id", "u-42");
        assert_eq!(config.run_id.as_deref(), Some("run-1"));
        assert_eq!(config.get("user_id"), Some(&Value::from("u-42")));
        assert!(config.get("missing").is_none());
    }

    /// **Scenario**: Without a token the config is never cancelled; with a
    /// cancelled token it reports cancelled.
    #[test]
    fn run_config_cancellation() {
        let config = RunConfig::new();
        assert!(!config.is_cancelled());

        let token = CancellationToken::new();
        let config = RunConfig::new().with_cancellation(token.clone());
        assert!(!config.is_cancelled());
        token.cancel();
        assert!(config.is_cancelled());
    }
}
