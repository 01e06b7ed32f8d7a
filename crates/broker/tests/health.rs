//! Integration tests for the liveness probe and general HTTP behaviour.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, test_config};

// ---------------------------------------------------------------------------
// Test: GET /healthz reports image and runtime identity
// ---------------------------------------------------------------------------

#[tokio::test]
async fn healthz_reports_identity() {
    // The probe never launches anything, so the runtime need not exist.
    let app = build_test_app(test_config("/nonexistent/docker"));
    let response = get(app, "/healthz").await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["image"], common::TEST_IMAGE);
    assert_eq!(json["runtime"], "default");
}

#[tokio::test]
async fn healthz_reports_configured_runtime() {
    let mut config = test_config("/nonexistent/docker");
    config.runtime = Some("runsc".to_string());
    let json = body_json(get(build_test_app(config), "/healthz").await).await;
    assert_eq!(json["runtime"], "runsc");
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = build_test_app(test_config("/nonexistent/docker"));
    let response = get(app, "/this-route-does-not-exist").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = build_test_app(test_config("/nonexistent/docker"));
    let response = get(app, "/healthz").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");

    // The value should be a valid UUID (36 chars with hyphens).
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}
