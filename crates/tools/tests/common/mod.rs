//! Shared helpers for the tool integration tests.
//!
//! Each test starts its own [`MockServer`] standing in for the broker.

#![allow(dead_code)]

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sandbox_tools::config::{ShellMode, ToolConfig};

/// Tool configuration pointed at `server`.
pub fn config_for(server: &MockServer, shell_mode: ShellMode) -> ToolConfig {
    ToolConfig {
        executor_url: server.uri(),
        client_overhead: Duration::from_secs(1),
        shell_mode,
        ..ToolConfig::default()
    }
}

/// Tool configuration pointed at a port nothing listens on.
pub fn unreachable_config() -> ToolConfig {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    ToolConfig {
        executor_url: format!("http://127.0.0.1:{port}"),
        client_overhead: Duration::from_secs(1),
        ..ToolConfig::default()
    }
}

/// A broker result body.
pub fn result_body(stdout: &str, stderr: &str, exit_code: i32) -> Value {
    json!({"stdout": stdout, "stderr": stderr, "exit_code": exit_code})
}

/// Answer every `POST {route}` with `template`.
pub async fn mount(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

/// Answer every `POST {route}` with a 200 carrying `body`.
pub async fn mount_result(server: &MockServer, route: &str, body: Value) {
    mount(server, route, ResponseTemplate::new(200).set_body_json(body)).await;
}

/// JSON bodies of every request the server has received, in order.
pub async fn received_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.body_json::<Value>().unwrap())
        .collect()
}

/// Paths of every request the server has received, in order.
pub async fn received_paths(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| request.url.path().to_string())
        .collect()
}
