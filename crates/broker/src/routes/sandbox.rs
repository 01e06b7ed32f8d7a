use axum::routing::post;
use axum::Router;

use crate::handlers::sandbox;
use crate::state::AppState;

/// Execution routes.
///
/// ```text
/// POST /run    -> run_code
/// POST /exec   -> run_process
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/run", post(sandbox::run_code))
        .route("/exec", post(sandbox::run_process))
}
