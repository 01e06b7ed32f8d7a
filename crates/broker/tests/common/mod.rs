//! Shared helpers for broker integration tests.
//!
//! Tests never talk to a real container runtime. [`FakeRuntime`] writes a
//! small shell script that accepts the runtime CLI's `run` arguments,
//! records them, skips past the image name and runs the container command
//! directly on the host. The interpreter command (`python -`) is mapped to
//! `/bin/sh`, so `/run` test payloads are shell code.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use sandbox_broker::config::BrokerConfig;
use sandbox_broker::router::build_app_router;
use sandbox_broker::state::AppState;

/// Image name the fake runtime scans for in its argument list.
pub const TEST_IMAGE: &str = "sandbox-test-image";

const FAKE_RUNTIME_SCRIPT: &str = r#"#!/bin/sh
if [ "$1" = "rm" ]; then
  sleep __RM_DELAY__
  printf '%s\n' "$@" > "$(dirname "$0")/rm-args"
  exit 0
fi
printf '%s\n' "$@" > "$(dirname "$0")/last-args"
while [ "$#" -gt 0 ] && [ "$1" != "sandbox-test-image" ]; do shift; done
shift
if [ "$1" = "python" ]; then exec /bin/sh; fi
exec "$@"
"#;

/// A stand-in container runtime living in a temporary directory.
pub struct FakeRuntime {
    dir: tempfile::TempDir,
    bin: PathBuf,
}

impl FakeRuntime {
    pub fn install() -> Self {
        Self::install_with_rm_delay(0)
    }

    /// A runtime whose `rm` takes `secs` seconds to complete.
    pub fn install_with_rm_delay(secs: u32) -> Self {
        let dir = tempfile::tempdir_in(env!("CARGO_TARGET_TMPDIR")).expect("create temp dir");
        let bin = dir.path().join("fake-runtime");
        let script = FAKE_RUNTIME_SCRIPT.replace("__RM_DELAY__", &secs.to_string());
        std::fs::write(&bin, script).expect("write fake runtime");
        std::fs::set_permissions(&bin, std::fs::Permissions::from_mode(0o755))
            .expect("chmod fake runtime");
        Self { dir, bin }
    }

    pub fn bin(&self) -> String {
        self.bin.to_str().expect("utf-8 path").to_string()
    }

    /// Arguments of the most recent `run` invocation, one per line.
    pub fn last_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.dir.path().join("last-args"))
            .expect("read recorded args")
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Arguments of the `rm` invocation, polling until it has run.
    pub async fn wait_for_rm_args(&self, timeout: Duration) -> Option<Vec<String>> {
        let path = self.dir.path().join("rm-args");
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(text) = std::fs::read_to_string(&path) {
                if text.ends_with('\n') {
                    return Some(text.lines().map(str::to_string).collect());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        None
    }

    /// Value following `--name` in the recorded `run` arguments.
    pub fn container_name(&self) -> String {
        let args = self.last_args();
        let i = args.iter().position(|a| a == "--name").expect("--name flag");
        args[i + 1].clone()
    }
}

/// Build a test `BrokerConfig` pointing at the given runtime binary.
///
/// Uses a 7-second ceiling and the production output cap.
pub fn test_config(runtime_bin: &str) -> BrokerConfig {
    BrokerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        request_timeout_secs: 30,
        image: TEST_IMAGE.to_string(),
        runtime: None,
        runtime_bin: runtime_bin.to_string(),
        timeout_ceiling_secs: 7,
        output_cap: 32_768,
        pids_limit: 64,
        tmpfs_mb: 64,
    }
}

/// Build the full application router (same middleware stack as `main.rs`).
pub fn build_test_app(config: BrokerConfig) -> Router {
    build_app_router(AppState::new(config))
}

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
