//! Mapping of broker outcomes onto tool-visible results.
//!
//! The two tools deliberately disagree on ambiguous outcomes: a silent,
//! successful run is an error for direct code and a valid empty result for
//! a shell script.

use sandbox_core::execution::{ExecutionResult, InnerShellResult};

use crate::error::ToolError;
use crate::python_exec::PythonExecOutput;
use crate::shell_exec::ShellExecOutput;

/// Maximum number of stderr characters quoted in an execution error.
pub const STDERR_EXCERPT_CHARS: usize = 800;

/// Trimmed stderr, capped at [`STDERR_EXCERPT_CHARS`] with a trailing `…`.
/// `None` when stderr is blank.
pub fn stderr_excerpt(stderr: &str) -> Option<String> {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.char_indices().nth(STDERR_EXCERPT_CHARS) {
        Some((cut, _)) => Some(format!("{}…", &trimmed[..cut])),
        None => Some(trimmed.to_string()),
    }
}

/// Classify a `/run` result for the direct-code tool.
pub fn classify_direct(result: ExecutionResult) -> Result<PythonExecOutput, ToolError> {
    if result.exit_code != 0 {
        let mut message = format!("sandbox failed (exit {})", result.exit_code);
        if let Some(excerpt) = stderr_excerpt(&result.stderr) {
            message.push_str(": ");
            message.push_str(&excerpt);
        }
        return Err(ToolError::SandboxExecution {
            exit_code: result.exit_code,
            message,
        });
    }

    if result.stdout.trim().is_empty() && result.stderr.trim().is_empty() {
        return Err(ToolError::EmptyResult);
    }

    let structured = serde_json::from_str(result.stdout.trim()).ok();

    Ok(PythonExecOutput {
        stdout: result.stdout,
        stderr: result.stderr,
        exit_code: result.exit_code,
        structured,
    })
}

/// Unwrap the outer `/run` result of a synthesized shell wrapper.
///
/// Never fails: an unparseable payload falls back to the raw text with
/// exit code zero.
pub fn unwrap_wrapped_shell(outer: ExecutionResult) -> ShellExecOutput {
    let payload = outer.stdout.trim();

    if payload.is_empty() {
        return ShellExecOutput {
            stdout: String::new(),
            stderr: outer.stderr,
            exit_code: 0,
        };
    }

    match InnerShellResult::from_stdout(payload) {
        Some(inner) => ShellExecOutput {
            stdout: inner.stdout,
            stderr: if inner.stderr.is_empty() {
                outer.stderr
            } else {
                inner.stderr
            },
            exit_code: inner.exit_code,
        },
        None => {
            tracing::warn!(
                payload_bytes = payload.len(),
                "Shell wrapper output was not a result object, returning raw text",
            );
            ShellExecOutput {
                stdout: payload.to_string(),
                stderr: outer.stderr,
                exit_code: 0,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
