use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Liveness probe payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    /// Image every sandbox is created from.
    pub image: String,
    /// Configured OCI runtime, or `"default"`.
    pub runtime: String,
}

/// GET /healthz -- reports configured identity; launches nothing.
pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        image: state.config.image.clone(),
        runtime: state.config.runtime_label().to_string(),
    })
}
