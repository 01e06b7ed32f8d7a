//! Sandbox execution handlers.
//!
//! Each request launches exactly one container and holds the handler task
//! until it exits or its deadline fires. A non-zero program exit is a normal
//! 200 response; only launch failures map to errors.

use axum::extract::State;
use axum::Json;
use sandbox_core::error::validate;
use sandbox_core::execution::{ExecutionRequest, ExecutionResult, ProcessRequest};

use crate::error::AppResult;
use crate::state::AppState;

/// POST /run
///
/// Feed `code` to the sandbox interpreter on stdin.
pub async fn run_code(
    State(state): State<AppState>,
    Json(input): Json<ExecutionRequest>,
) -> AppResult<Json<ExecutionResult>> {
    validate(&input)?;

    let code_bytes = input.code.len();
    let timeout_s = input.limits.timeout_s;
    let result = state.executor.run_code(input).await?;

    log_result("run", code_bytes, timeout_s, &result);
    Ok(Json(result))
}

/// POST /exec
///
/// Run an explicit argv inside the sandbox with the given stdin.
pub async fn run_process(
    State(state): State<AppState>,
    Json(input): Json<ProcessRequest>,
) -> AppResult<Json<ExecutionResult>> {
    validate(&input)?;

    let stdin_bytes = input.stdin.len();
    let timeout_s = input.limits.timeout_s;
    let result = state.executor.run_process(input).await?;

    log_result("exec", stdin_bytes, timeout_s, &result);
    Ok(Json(result))
}

fn log_result(kind: &'static str, input_bytes: usize, timeout_s: u32, result: &ExecutionResult) {
    if result.is_timeout() {
        tracing::warn!(kind, input_bytes, timeout_s, "Sandbox run timed out");
    } else {
        tracing::info!(
            kind,
            input_bytes,
            exit_code = result.exit_code,
            stdout_bytes = result.stdout.len(),
            stderr_bytes = result.stderr.len(),
            "Sandbox run finished",
        );
    }
}
