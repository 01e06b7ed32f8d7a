//! One-shot container launcher.
//!
//! Builds a locked-down `run` invocation for an external OCI runtime CLI
//! (Docker-compatible), pipes the request's stdin into it, and maps the
//! governed outcome onto an [`ExecutionResult`]. The runtime does the
//! isolation; this module only shapes the request and polices time and
//! output.

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use uuid::Uuid;

use super::subprocess::{self, ProcessOutcome};
use crate::error::LaunchError;
use crate::execution::{
    ExecutionRequest, ExecutionResult, ProcessRequest, ResourceLimits, DEFAULT_OUTPUT_CAP,
};

/// Environment applied to every sandbox: headless plotting, writable cache
/// paths on tmpfs, and single-threaded numeric libraries to play nice with
/// the CPU share.
pub const SANDBOX_ENV: &[(&str, &str)] = &[
    ("PYTHONUNBUFFERED", "1"),
    ("MPLBACKEND", "Agg"),
    ("MPLCONFIGDIR", "/tmp"),
    ("XDG_CACHE_HOME", "/tmp"),
    ("OPENBLAS_NUM_THREADS", "1"),
    ("OMP_NUM_THREADS", "1"),
    ("NUMEXPR_MAX_THREADS", "1"),
];

/// Writable tmpfs mount points inside the otherwise read-only container.
const TMPFS_MOUNTS: &[&str] = &["/tmp", "/home"];

/// Upper bound on the best-effort container removal after a timeout.
const REMOVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Static isolation settings shared by every launch.
#[derive(Debug, Clone)]
pub struct SandboxPolicy {
    /// Image the sandbox container is created from.
    pub image: String,
    /// Alternate OCI runtime (e.g. `runsc`); `None` uses the runtime default.
    pub runtime: Option<String>,
    /// Runtime CLI executable (default: `docker`).
    pub runtime_bin: String,
    /// Maximum number of processes inside the container.
    pub pids_limit: u32,
    /// Size of each writable tmpfs mount in MiB.
    pub tmpfs_mb: u32,
    /// Command that reads interpreter source on stdin.
    pub interpreter: Vec<String>,
}

impl Default for SandboxPolicy {
    fn default() -> Self {
        Self {
            image: "medschool-sandbox".to_string(),
            runtime: None,
            runtime_bin: "docker".to_string(),
            pids_limit: 64,
            tmpfs_mb: 64,
            interpreter: vec!["python".to_string(), "-".to_string()],
        }
    }
}

/// A fully shaped launch: what to run in the container and what to feed it.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    /// Command executed inside the container after the image name.
    pub command: Vec<String>,
    /// Bytes written to the command's stdin.
    pub stdin: String,
    pub limits: ResourceLimits,
}

/// Launches one isolated container per request and governs its lifetime.
#[derive(Debug, Clone)]
pub struct ContainerExecutor {
    policy: SandboxPolicy,
    ceiling: Duration,
    output_cap: usize,
}

impl ContainerExecutor {
    /// Create an executor enforcing `ceiling` as the hard wall-clock limit
    /// and `output_cap` bytes per output stream.
    pub fn new(policy: SandboxPolicy, ceiling: Duration, output_cap: usize) -> Self {
        Self {
            policy,
            ceiling,
            output_cap,
        }
    }

    pub fn policy(&self) -> &SandboxPolicy {
        &self.policy
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    pub fn output_cap(&self) -> usize {
        self.output_cap
    }

    /// Effective deadline: the requested timeout, never above the ceiling.
    pub fn deadline(&self, limits: &ResourceLimits) -> Duration {
        Duration::from_secs(u64::from(limits.timeout_s)).min(self.ceiling)
    }

    /// Run interpreter source fed on stdin.
    pub async fn run_code(&self, req: ExecutionRequest) -> Result<ExecutionResult, LaunchError> {
        self.execute(LaunchRequest {
            command: self.policy.interpreter.clone(),
            stdin: req.code,
            limits: req.limits,
        })
        .await
    }

    /// Run an explicit argv with the given stdin.
    pub async fn run_process(&self, req: ProcessRequest) -> Result<ExecutionResult, LaunchError> {
        self.execute(LaunchRequest {
            command: req.argv,
            stdin: req.stdin,
            limits: req.limits,
        })
        .await
    }

    /// Launch the container and wait for it within the effective deadline.
    pub async fn execute(&self, launch: LaunchRequest) -> Result<ExecutionResult, LaunchError> {
        let name = format!("sandbox-{}", Uuid::new_v4().simple());
        let deadline = self.deadline(&launch.limits);

        let mut cmd = Command::new(&self.policy.runtime_bin);
        cmd.args(self.run_args(&name, &launch));

        tracing::debug!(
            container = %name,
            deadline_ms = deadline.as_millis() as u64,
            mem_mb = launch.limits.mem_mb,
            cpus = launch.limits.cpus,
            "Launching sandbox",
        );

        let outcome = subprocess::run_command(
            &mut cmd,
            launch.stdin.into_bytes(),
            deadline,
            self.output_cap,
        )
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LaunchError::RuntimeNotFound {
                bin: self.policy.runtime_bin.clone(),
                source: e,
            },
            _ => LaunchError::Io(e),
        })?;

        match outcome {
            ProcessOutcome::Exited(output) => {
                tracing::debug!(
                    container = %name,
                    exit_code = output.exit_code,
                    duration_ms = output.duration_ms,
                    stdout_bytes = output.stdout.len(),
                    stderr_bytes = output.stderr.len(),
                    "Sandbox exited",
                );
                Ok(ExecutionResult {
                    stdout: output.stdout,
                    stderr: output.stderr,
                    exit_code: output.exit_code,
                })
            }
            ProcessOutcome::TimedOut { elapsed_ms } => {
                tracing::warn!(container = %name, elapsed_ms, "Sandbox exceeded its deadline");
                let bin = self.policy.runtime_bin.clone();
                tokio::spawn(remove_container(bin, name));
                Ok(ExecutionResult::timed_out())
            }
        }
    }

    /// Arguments passed to the runtime CLI for one launch.
    pub fn run_args(&self, name: &str, launch: &LaunchRequest) -> Vec<String> {
        let mut args: Vec<String> = [
            "run",
            "--rm",
            "-i",
            "--name",
            name,
            "--network",
            "none",
            "--pids-limit",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        args.push(self.policy.pids_limit.to_string());
        args.push("--memory".to_string());
        args.push(format!("{}m", launch.limits.mem_mb));
        args.push("--cpus".to_string());
        args.push(launch.limits.cpus.to_string());
        args.extend(
            [
                "--read-only",
                "--cap-drop",
                "ALL",
                "--security-opt",
                "no-new-privileges:true",
            ]
            .iter()
            .map(|s| s.to_string()),
        );

        for mount in TMPFS_MOUNTS {
            args.push("--tmpfs".to_string());
            args.push(format!(
                "{mount}:rw,noexec,nosuid,nodev,size={}m",
                self.policy.tmpfs_mb
            ));
        }

        for (key, value) in SANDBOX_ENV {
            args.push("-e".to_string());
            args.push(format!("{key}={value}"));
        }

        if let Some(runtime) = &self.policy.runtime {
            args.push("--runtime".to_string());
            args.push(runtime.clone());
        }

        args.push(self.policy.image.clone());
        args.extend(launch.command.iter().cloned());
        args
    }
}

impl Default for ContainerExecutor {
    fn default() -> Self {
        Self::new(
            SandboxPolicy::default(),
            Duration::from_secs(7),
            DEFAULT_OUTPUT_CAP,
        )
    }
}

/// Force-remove a container whose client was killed at the deadline.
///
/// Killing the CLI does not stop a detached container, so this is the step
/// that actually ends the sandboxed process tree. Runs detached from the
/// request: the caller already has its timeout result.
async fn remove_container(runtime_bin: String, name: String) {
    let removal = Command::new(&runtime_bin)
        .args(["rm", "-f", name.as_str()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    match tokio::time::timeout(REMOVE_TIMEOUT, removal).await {
        Ok(Ok(status)) if status.success() => {
            tracing::debug!(container = %name, "Removed timed-out sandbox");
        }
        Ok(Ok(status)) => {
            tracing::warn!(container = %name, code = ?status.code(), "Container removal failed");
        }
        Ok(Err(e)) => {
            tracing::warn!(container = %name, error = %e, "Container removal could not start");
        }
        Err(_) => {
            tracing::warn!(container = %name, "Container removal timed out");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
