//! Name-to-handler dispatch for the sandbox tools.
//!
//! The registry is built once at startup from a [`ToolConfig`] and never
//! mutated while serving calls.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ToolConfig;
use crate::error::ToolError;
use crate::python_exec::ExecutionClient;
use crate::shell_exec::ShellAdapter;

/// A callable capability exposed to the agent runtime.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Stable capability name, e.g. `python_exec`.
    fn name(&self) -> &'static str;

    /// Human-readable description shown to callers.
    fn description(&self) -> &'static str;

    /// Handle one call with JSON arguments, returning a JSON result.
    async fn call(&self, args: Value) -> Result<Value, ToolError>;
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `python_exec` and `shell_exec`.
    pub fn with_sandbox_tools(config: &ToolConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ExecutionClient::new(config)));
        registry.register(Arc::new(ShellAdapter::new(config)));
        registry
    }

    /// Add a handler, replacing any previous one with the same name.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        self.tools.insert(handler.name(), handler);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolHandler>> {
        self.tools.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tools.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ToolHandler>> {
        self.tools.values()
    }

    /// Dispatch a call by name.
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let handler = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        tracing::info!(tool = name, "Dispatching tool call");
        let result = handler.call(args).await;
        if let Err(e) = &result {
            tracing::warn!(tool = name, error = %e, "Tool call failed");
        }
        result
    }
}

/// Decode tool arguments. `null` means "no arguments".
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    let args = match args {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::python_exec::PythonExecArgs;
    use crate::shell_exec::ShellExecArgs;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn description(&self) -> &'static str {
            "Returns its arguments."
        }

        async fn call(&self, args: Value) -> Result<Value, ToolError> {
            Ok(args)
        }
    }

    #[test]
    fn sandbox_tools_are_registered() {
        let registry = ToolRegistry::with_sandbox_tools(&ToolConfig::default());
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["python_exec", "shell_exec"]);
        assert!(registry.iter().all(|tool| !tool.description().is_empty()));
    }

    #[tokio::test]
    async fn call_dispatches_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        let result = registry.call("echo", json!({"x": 1})).await.unwrap();
        assert_eq!(result, json!({"x": 1}));
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let registry = ToolRegistry::new();
        let err = registry.call("rm_rf", Value::Null).await.unwrap_err();
        assert_matches!(err, ToolError::UnknownTool(name) if name == "rm_rf");
    }

    #[test]
    fn null_args_mean_defaults() {
        let args: PythonExecArgs = parse_args("python_exec", Value::Null).unwrap();
        assert!(args.code.is_none());
    }

    #[test]
    fn malformed_args_are_invalid() {
        let err = parse_args::<ShellExecArgs>("shell_exec", json!({"script": 5})).unwrap_err();
        assert_matches!(err, ToolError::InvalidArguments { ref tool, .. } if tool == "shell_exec");

        let err = parse_args::<PythonExecArgs>("python_exec", json!({"source": "x"})).unwrap_err();
        assert_matches!(err, ToolError::InvalidArguments { .. });
    }
}
