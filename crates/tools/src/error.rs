use crate::client::BrokerClientError;

/// Tool-visible failures.
///
/// `Transport` is shared by both tools. `SandboxExecution` and
/// `EmptyResult` are raised only by `python_exec`; `shell_exec` reports
/// execution outcomes as data.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The broker was unreachable or answered with a non-success or
    /// unparseable response.
    #[error("sandbox HTTP error: {message}. Check sandbox service ({endpoint}).")]
    Transport { endpoint: String, message: String },

    /// The sandboxed program exited non-zero or timed out.
    #[error("{message}")]
    SandboxExecution { exit_code: i32, message: String },

    /// The program exited zero without printing anything.
    #[error(
        "No stdout captured. Make sure to print any results you want to use \
         (prefer JSON, e.g., print(json.dumps({{...}})))."
    )]
    EmptyResult,

    /// The tool arguments did not match the tool's input shape.
    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    /// No tool is registered under this name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A tool result could not be encoded as JSON.
    #[error("Failed to encode tool result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ToolError {
    /// Wrap a broker client failure, naming the endpoint that was called.
    pub fn transport(endpoint: &str, err: BrokerClientError) -> Self {
        Self::Transport {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }
}
