use std::time::Duration;

use sandbox_core::config::{parse_or, string_or, ConfigError};
use sandbox_core::execution::DEFAULT_OUTPUT_CAP;
use sandbox_core::scripting::container::{ContainerExecutor, SandboxPolicy};

/// Broker configuration loaded from environment variables.
///
/// All fields have defaults suitable for a single-host deployment next to
/// a Docker daemon. Read once at startup and passed into the app state.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8088`).
    pub port: u16,
    /// HTTP request timeout in seconds (default: `60`).
    pub request_timeout_secs: u64,
    /// Image used for every sandbox container.
    pub image: String,
    /// Alternate OCI runtime such as `runsc`; `None` means runtime default.
    pub runtime: Option<String>,
    /// Runtime CLI executable.
    pub runtime_bin: String,
    /// Server-side wall-clock ceiling in seconds.
    pub timeout_ceiling_secs: u64,
    /// Per-stream output cap in bytes.
    pub output_cap: usize,
    /// Process-count limit inside each container.
    pub pids_limit: u32,
    /// Size of each writable tmpfs mount in MiB.
    pub tmpfs_mb: u32,
}

impl BrokerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                | Default              |
    /// |------------------------|----------------------|
    /// | `HOST`                 | `0.0.0.0`            |
    /// | `PORT`                 | `8088`               |
    /// | `REQUEST_TIMEOUT_SECS` | `60`                 |
    /// | `SANDBOX_IMAGE`        | `medschool-sandbox`  |
    /// | `SANDBOX_RUNTIME`      | (runtime default)    |
    /// | `SANDBOX_RUNTIME_BIN`  | `docker`             |
    /// | `SANDBOX_TIMEOUT`      | `7`                  |
    /// | `SANDBOX_OUTPUT_CAP`   | `32768`              |
    /// | `SANDBOX_PIDS_LIMIT`   | `64`                 |
    /// | `SANDBOX_TMPFS_MB`     | `64`                 |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = SandboxPolicy::default();

        let runtime = string_or(lookup, "SANDBOX_RUNTIME", "");
        let timeout_ceiling_secs: u64 = parse_or(lookup, "SANDBOX_TIMEOUT", 7)?;
        if timeout_ceiling_secs == 0 {
            return Err(ConfigError::OutOfRange {
                key: "SANDBOX_TIMEOUT",
                reason: "the ceiling must be at least one second".to_string(),
            });
        }

        Ok(Self {
            host: string_or(lookup, "HOST", "0.0.0.0"),
            port: parse_or(lookup, "PORT", 8088)?,
            request_timeout_secs: parse_or(lookup, "REQUEST_TIMEOUT_SECS", 60)?,
            image: string_or(lookup, "SANDBOX_IMAGE", &defaults.image),
            runtime: (!runtime.is_empty()).then_some(runtime),
            runtime_bin: string_or(lookup, "SANDBOX_RUNTIME_BIN", &defaults.runtime_bin),
            timeout_ceiling_secs,
            output_cap: parse_or(lookup, "SANDBOX_OUTPUT_CAP", DEFAULT_OUTPUT_CAP)?,
            pids_limit: parse_or(lookup, "SANDBOX_PIDS_LIMIT", defaults.pids_limit)?,
            tmpfs_mb: parse_or(lookup, "SANDBOX_TMPFS_MB", defaults.tmpfs_mb)?,
        })
    }

    /// Runtime identity reported by the liveness probe.
    pub fn runtime_label(&self) -> &str {
        self.runtime.as_deref().unwrap_or("default")
    }

    /// Build the container executor described by this configuration.
    pub fn executor(&self) -> ContainerExecutor {
        let policy = SandboxPolicy {
            image: self.image.clone(),
            runtime: self.runtime.clone(),
            runtime_bin: self.runtime_bin.clone(),
            pids_limit: self.pids_limit,
            tmpfs_mb: self.tmpfs_mb,
            ..SandboxPolicy::default()
        };
        ContainerExecutor::new(
            policy,
            Duration::from_secs(self.timeout_ceiling_secs),
            self.output_cap,
        )
    }
}
