use axum::routing::get;
use axum::Router;

use crate::handlers::health;
use crate::state::AppState;

/// Mount the liveness probe.
pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(health::healthz))
}
