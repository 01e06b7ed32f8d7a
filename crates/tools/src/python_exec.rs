//! `python_exec`: run interpreter code in the sandbox.
//!
//! The caller's code is sent to `POST /run` with the configured resource
//! limits. Results follow a print-based contract: output must be printed to
//! stdout (ideally JSON), so a silent successful run is rejected.

use std::time::Duration;

use async_trait::async_trait;
use sandbox_core::execution::{ExecutionRequest, ResourceLimits};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::BrokerClient;
use crate::config::ToolConfig;
use crate::error::ToolError;
use crate::normalize;
use crate::registry::{parse_args, ToolHandler};

/// Code run when the caller supplies none: reports the interpreter version
/// and installed packages as JSON, so the no-argument call still makes a
/// full round trip through the sandbox.
pub const INTROSPECTION_SNIPPET: &str = "\
import json, importlib.metadata, platform
pkgs = [{'name': d.metadata['Name'], 'version': d.version}
        for d in importlib.metadata.distributions()]
print(json.dumps({'python': platform.python_version(), 'packages': pkgs}))
";

const DESCRIPTION: &str = "\
Run short Python 3 code inside a locked-down sandbox (no network, read-only \
root filesystem, /tmp and /home writable tmpfs, CPU/memory/time limited, \
stdout/stderr capped at ~32 KB). Print your final result to stdout, \
preferably as JSON. Args: code (str, optional); if omitted, returns the \
Python version and installed packages. Returns {stdout, stderr, exit_code, \
structured} where `structured` is the parsed stdout when it is valid JSON. \
Fails on sandbox errors, non-zero exit, or when nothing is printed.";

/// Arguments accepted by `python_exec`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PythonExecArgs {
    #[serde(default)]
    pub code: Option<String>,
}

/// Successful `python_exec` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PythonExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// Stdout parsed as JSON, when it is valid JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<Value>,
}

/// Direct-code client for the broker.
#[derive(Debug, Clone)]
pub struct ExecutionClient {
    broker: BrokerClient,
    limits: ResourceLimits,
    client_overhead: Duration,
}

impl ExecutionClient {
    pub fn new(config: &ToolConfig) -> Self {
        Self::with_broker(BrokerClient::new(&config.executor_url), config)
    }

    pub fn with_broker(broker: BrokerClient, config: &ToolConfig) -> Self {
        Self {
            broker,
            limits: config.limits,
            client_overhead: config.client_overhead,
        }
    }

    /// Run `code` (or the introspection snippet) with the default limits.
    pub async fn run(&self, code: Option<&str>) -> Result<PythonExecOutput, ToolError> {
        self.run_with_limits(code, self.limits).await
    }

    /// Run `code` (or the introspection snippet) with explicit limits.
    pub async fn run_with_limits(
        &self,
        code: Option<&str>,
        limits: ResourceLimits,
    ) -> Result<PythonExecOutput, ToolError> {
        let code = match code {
            None | Some("") => INTROSPECTION_SNIPPET.to_string(),
            Some(code) => dedent(code),
        };

        let request = ExecutionRequest { code, limits };
        let timeout = Duration::from_secs(u64::from(limits.timeout_s)) + self.client_overhead;

        tracing::debug!(
            endpoint = %self.broker.endpoint(),
            code_bytes = request.code.len(),
            timeout_ms = timeout.as_millis() as u64,
            "Sending python_exec request",
        );

        let result = self
            .broker
            .run(&request, timeout)
            .await
            .map_err(|e| {
                tracing::warn!(endpoint = %self.broker.endpoint(), error = %e, "Broker call failed");
                ToolError::transport(self.broker.endpoint(), e)
            })?;

        normalize::classify_direct(result)
    }
}

#[async_trait]
impl ToolHandler for ExecutionClient {
    fn name(&self) -> &'static str {
        "python_exec"
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let args: PythonExecArgs = parse_args(self.name(), args)?;
        let output = self.run(args.code.as_deref()).await?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Remove the whitespace prefix shared by every non-blank line.
///
/// Lets callers send code that was indented inside a larger document.
pub fn dedent(code: &str) -> String {
    let prefix = code
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| &line[..line.len() - line.trim_start().len()])
        .reduce(|common, indent| {
            let shared = common
                .char_indices()
                .zip(indent.chars())
                .take_while(|((_, a), b)| a == b)
                .last()
                .map_or(0, |((i, a), _)| i + a.len_utf8());
            &common[..shared]
        })
        .unwrap_or("");

    if prefix.is_empty() {
        return code.to_string();
    }

    let mut out = String::with_capacity(code.len());
    for line in code.split_inclusive('\n') {
        out.push_str(line.strip_prefix(prefix).unwrap_or(line.trim_start_matches([' ', '\t'])));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedent_strips_common_indent() {
        let code = "    import json\n    if True:\n        print(1)\n";
        assert_eq!(dedent(code), "import json\nif True:\n    print(1)\n");
    }

    #[test]
    fn dedent_ignores_blank_lines() {
        let code = "  a = 1\n\n  print(a)";
        assert_eq!(dedent(code), "a = 1\n\nprint(a)");
    }

    #[test]
    fn dedent_leaves_flush_code_alone() {
        let code = "print('hi')\n  # trailing comment\n";
        assert_eq!(dedent(code), code);
    }

    #[test]
    fn dedent_does_not_mix_tabs_and_spaces() {
        let code = "\tx = 1\n    y = 2\n";
        assert_eq!(dedent(code), code);
    }

    #[test]
    fn output_omits_absent_structure() {
        let output = PythonExecOutput {
            stdout: "hi\n".to_string(),
            stderr: String::new(),
            exit_code: 0,
            structured: None,
        };
        let json = serde_json::to_value(&output).unwrap();
        assert!(json.get("structured").is_none());
        assert_eq!(json["stdout"], "hi\n");
    }

    #[test]
    fn snippet_prints_json() {
        assert!(INTROSPECTION_SNIPPET.contains("importlib.metadata"));
        assert!(INTROSPECTION_SNIPPET.contains("print(json.dumps("));
    }
}
