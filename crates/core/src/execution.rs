//! Request and result types exchanged with the execution broker.
//!
//! Bodies are bounds-checked with [`validator`] before a sandbox is
//! launched. Every field of [`ResourceLimits`] has its own default so a
//! caller may omit any subset of them.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Exit code reported when a process overruns its deadline.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Stderr text reported alongside [`TIMEOUT_EXIT_CODE`].
pub const TIMEOUT_STDERR: &str = "TIMEOUT";

/// Default per-stream output cap in bytes.
pub const DEFAULT_OUTPUT_CAP: usize = 32_768;

pub const DEFAULT_TIMEOUT_S: u32 = 6;
pub const DEFAULT_MEM_MB: u32 = 512;
pub const DEFAULT_CPUS: f64 = 1.0;

fn default_timeout_s() -> u32 {
    DEFAULT_TIMEOUT_S
}

fn default_mem_mb() -> u32 {
    DEFAULT_MEM_MB
}

fn default_cpus() -> f64 {
    DEFAULT_CPUS
}

/// Resource ceilings applied to a single sandbox run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct ResourceLimits {
    /// Requested wall-clock deadline in seconds.
    #[serde(default = "default_timeout_s")]
    #[validate(range(min = 1, max = 30))]
    pub timeout_s: u32,
    /// Memory ceiling in MiB.
    #[serde(default = "default_mem_mb")]
    #[validate(range(min = 64, max = 4096))]
    pub mem_mb: u32,
    /// CPU share (fractional cores).
    #[serde(default = "default_cpus")]
    #[validate(range(min = 0.1, max = 2.0))]
    pub cpus: f64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            timeout_s: DEFAULT_TIMEOUT_S,
            mem_mb: DEFAULT_MEM_MB,
            cpus: DEFAULT_CPUS,
        }
    }
}

/// Body of `POST /run`: interpreter source fed to the sandbox on stdin.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExecutionRequest {
    #[serde(default)]
    pub code: String,
    #[serde(flatten)]
    #[validate(nested)]
    pub limits: ResourceLimits,
}

/// Body of `POST /exec`: an explicit argv run inside the sandbox.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProcessRequest {
    #[validate(length(min = 1, message = "argv must name a program"))]
    pub argv: Vec<String>,
    #[serde(default)]
    pub stdin: String,
    #[serde(flatten)]
    #[validate(nested)]
    pub limits: ResourceLimits,
}

/// Outcome of one sandbox run, as returned by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecutionResult {
    /// The synthetic result for a run killed at its deadline.
    pub fn timed_out() -> Self {
        Self {
            stdout: String::new(),
            stderr: TIMEOUT_STDERR.to_string(),
            exit_code: TIMEOUT_EXIT_CODE,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.exit_code == TIMEOUT_EXIT_CODE && self.stderr == TIMEOUT_STDERR
    }
}

/// Result of a nested shell, printed as JSON by the shell wrapper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InnerShellResult {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub exit_code: i32,
}

impl InnerShellResult {
    /// Decode the wrapper's stdout. Only a JSON object is accepted.
    pub fn from_stdout(text: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(text).ok()?;
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::error::{validate, CoreError};

    #[test]
    fn missing_limits_take_defaults() {
        let req: ExecutionRequest = serde_json::from_str(r#"{"code": "print(1)"}"#).unwrap();
        assert_eq!(req.code, "print(1)");
        assert_eq!(req.limits, ResourceLimits::default());
        assert_eq!(req.limits.timeout_s, 6);
        assert_eq!(req.limits.mem_mb, 512);
    }

    #[test]
    fn limits_default_independently() {
        let req: ExecutionRequest =
            serde_json::from_str(r#"{"code": "", "mem_mb": 1024, "cpus": 2}"#).unwrap();
        assert_eq!(req.limits.timeout_s, DEFAULT_TIMEOUT_S);
        assert_eq!(req.limits.mem_mb, 1024);
        assert!((req.limits.cpus - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_body_is_a_valid_request() {
        let req: ExecutionRequest = serde_json::from_str("{}").unwrap();
        assert!(req.code.is_empty());
        assert!(validate(&req).is_ok());
    }

    #[test]
    fn bounds_are_inclusive() {
        let low = ResourceLimits {
            timeout_s: 1,
            mem_mb: 64,
            cpus: 0.1,
        };
        let high = ResourceLimits {
            timeout_s: 30,
            mem_mb: 4096,
            cpus: 2.0,
        };
        assert!(validate(&low).is_ok());
        assert!(validate(&high).is_ok());
    }

    #[test]
    fn out_of_range_limits_are_rejected() {
        let cases = [
            r#"{"timeout_s": 0}"#,
            r#"{"timeout_s": 31}"#,
            r#"{"mem_mb": 32}"#,
            r#"{"mem_mb": 8192}"#,
            r#"{"cpus": 0.05}"#,
            r#"{"cpus": 4.0}"#,
        ];
        for body in cases {
            let req: ExecutionRequest = serde_json::from_str(body).unwrap();
            assert_matches!(validate(&req), Err(CoreError::Validation(_)), "{body}");
        }
    }

    #[test]
    fn process_request_requires_argv() {
        let req: ProcessRequest = serde_json::from_str(r#"{"argv": []}"#).unwrap();
        let err = validate(&req).unwrap_err();
        assert!(err.to_string().contains("argv"));

        let req: ProcessRequest =
            serde_json::from_str(r#"{"argv": ["/bin/sh", "-c", "true"]}"#).unwrap();
        assert!(validate(&req).is_ok());
        assert!(req.stdin.is_empty());
    }

    #[test]
    fn timed_out_result_is_canonical() {
        let result = ExecutionResult::timed_out();
        assert_eq!(result.exit_code, 124);
        assert_eq!(result.stderr, "TIMEOUT");
        assert!(result.stdout.is_empty());
        assert!(result.is_timeout());
    }

    #[test]
    fn inner_result_parses_full_triple() {
        let inner =
            InnerShellResult::from_stdout(r#"{"stdout": "hi\n", "stderr": "", "exit_code": 7}"#)
                .expect("should parse");
        assert_eq!(inner.stdout, "hi\n");
        assert_eq!(inner.exit_code, 7);
    }

    #[test]
    fn inner_result_defaults_missing_fields() {
        let inner = InnerShellResult::from_stdout(r#"{"stdout": "x"}"#).expect("should parse");
        assert_eq!(inner.stderr, "");
        assert_eq!(inner.exit_code, 0);
    }

    #[test]
    fn inner_result_rejects_non_objects() {
        assert!(InnerShellResult::from_stdout("hello").is_none());
        assert!(InnerShellResult::from_stdout("42").is_none());
        assert!(InnerShellResult::from_stdout(r#"["a", "b", 1]"#).is_none());
        assert!(InnerShellResult::from_stdout(r#"{"exit_code": "seven"}"#).is_none());
    }
}
