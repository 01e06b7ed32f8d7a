//! `shell_exec`: run a shell script in the sandbox.
//!
//! In [`ShellMode::Wrapped`] the script travels inside generated interpreter
//! code through `POST /run`, and the nested result is unwrapped from the
//! outer stdout. In [`ShellMode::Native`] the broker runs the shell argv
//! itself through `POST /exec`. Either way the script's exit code is data:
//! only transport failures are errors.

use std::time::Duration;

use async_trait::async_trait;
use sandbox_core::execution::{ExecutionRequest, ProcessRequest, ResourceLimits};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::BrokerClient;
use crate::config::{ShellMode, ToolConfig};
use crate::error::ToolError;
use crate::normalize;
use crate::registry::{parse_args, ToolHandler};

/// Picks bash when the image has it, else POSIX sh. The script arrives as `$1`.
const SHELL_TRAMPOLINE: &str =
    r#"if [ -x /bin/bash ]; then exec /bin/bash -lc "$1"; fi; exec /bin/sh -lc "$1""#;

const DESCRIPTION: &str = "\
Run a bash (or POSIX sh) script inside the same locked-down sandbox used by \
python_exec. Args: script (str), stdin (str, optional), timeout_s (int, \
optional). Returns {stdout, stderr, exit_code}. A non-zero exit code is \
reported in the result rather than raised.";

/// Arguments accepted by `shell_exec`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShellExecArgs {
    pub script: String,
    #[serde(default)]
    pub stdin: Option<String>,
    /// Deadline override; `None` or `0` keeps the configured default.
    #[serde(default)]
    pub timeout_s: Option<u32>,
}

/// `shell_exec` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Shell client for the broker.
#[derive(Debug, Clone)]
pub struct ShellAdapter {
    broker: BrokerClient,
    limits: ResourceLimits,
    client_overhead: Duration,
    mode: ShellMode,
}

impl ShellAdapter {
    pub fn new(config: &ToolConfig) -> Self {
        Self::with_broker(BrokerClient::new(&config.executor_url), config)
    }

    pub fn with_broker(broker: BrokerClient, config: &ToolConfig) -> Self {
        Self {
            broker,
            limits: config.limits,
            client_overhead: config.client_overhead,
            mode: config.shell_mode,
        }
    }

    pub fn mode(&self) -> ShellMode {
        self.mode
    }

    pub async fn run(&self, args: &ShellExecArgs) -> Result<ShellExecOutput, ToolError> {
        let limits = ResourceLimits {
            timeout_s: args
                .timeout_s
                .filter(|&t| t != 0)
                .unwrap_or(self.limits.timeout_s),
            ..self.limits
        };
        let timeout = Duration::from_secs(u64::from(limits.timeout_s)) + self.client_overhead;
        let stdin = args.stdin.as_deref().unwrap_or("");

        tracing::debug!(
            endpoint = %self.broker.endpoint(),
            mode = %self.mode,
            script_bytes = args.script.len(),
            timeout_s = limits.timeout_s,
            "Sending shell_exec request",
        );

        match self.mode {
            ShellMode::Wrapped => {
                let request = ExecutionRequest {
                    code: wrapper_source(&args.script, stdin),
                    limits,
                };
                let outer = self
                    .broker
                    .run(&request, timeout)
                    .await
                    .map_err(|e| self.transport(e))?;
                Ok(normalize::unwrap_wrapped_shell(outer))
            }
            ShellMode::Native => {
                let request = ProcessRequest {
                    argv: native_argv(&args.script),
                    stdin: stdin.to_string(),
                    limits,
                };
                let result = self
                    .broker
                    .exec(&request, timeout)
                    .await
                    .map_err(|e| self.transport(e))?;
                Ok(ShellExecOutput {
                    stdout: result.stdout,
                    stderr: result.stderr,
                    exit_code: result.exit_code,
                })
            }
        }
    }

    fn transport(&self, err: crate::client::BrokerClientError) -> ToolError {
        tracing::warn!(endpoint = %self.broker.endpoint(), error = %err, "Broker call failed");
        ToolError::transport(self.broker.endpoint(), err)
    }
}

#[async_trait]
impl ToolHandler for ShellAdapter {
    fn name(&self) -> &'static str {
        "shell_exec"
    }

    fn description(&self) -> &'static str {
        DESCRIPTION
    }

    async fn call(&self, args: Value) -> Result<Value, ToolError> {
        let args: ShellExecArgs = parse_args(self.name(), args)?;
        let output = self.run(&args).await?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Interpreter source that runs `script` under a login shell with `stdin`
/// and prints the nested `{stdout, stderr, exit_code}` as one JSON object.
///
/// Both strings are embedded as JSON string literals, which the interpreter
/// reads as ordinary string literals, so no quoting of the script is needed.
pub fn wrapper_source(script: &str, stdin: &str) -> String {
    let script = Value::String(script.to_string());
    let stdin = Value::String(stdin.to_string());
    format!(
        "import json, os, subprocess\n\
         script = {script}\n\
         stdin = {stdin}\n\
         shell = '/bin/bash' if os.path.exists('/bin/bash') else '/bin/sh'\n\
         p = subprocess.run([shell, '-lc', script], input=stdin, capture_output=True, text=True)\n\
         print(json.dumps({{'stdout': p.stdout, 'stderr': p.stderr, 'exit_code': p.returncode}}))\n"
    )
}

/// Argv for `POST /exec`: the trampoline gets `sh` as `$0` and the script as `$1`.
pub fn native_argv(script: &str) -> Vec<String> {
    vec![
        "/bin/sh".to_string(),
        "-c".to_string(),
        SHELL_TRAMPOLINE.to_string(),
        "sh".to_string(),
        script.to_string(),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
