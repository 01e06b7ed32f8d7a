use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sandbox_core::error::{CoreError, LaunchError};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// A sandboxed program that exits non-zero is never an error here; these
/// variants cover only requests that cannot be run at all. Implements
/// [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `sandbox_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The sandbox could not be launched.
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Core(CoreError::Validation(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
            }
            AppError::Launch(LaunchError::RuntimeNotFound { .. }) => {
                tracing::error!(error = %self, "Container runtime unavailable");
                (StatusCode::INTERNAL_SERVER_ERROR, "RUNTIME_UNAVAILABLE")
            }
            AppError::Launch(LaunchError::Io(_)) => {
                tracing::error!(error = %self, "Sandbox launch failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "LAUNCH_FAILED")
            }
        };

        // Launch diagnostics are returned verbatim: callers have no access
        // to broker logs.
        let body = json!({
            "error": self.to_string(),
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
