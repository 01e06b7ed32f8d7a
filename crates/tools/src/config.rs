use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use sandbox_core::config::{parse_or, string_or, ConfigError};
use sandbox_core::error::validate;
use sandbox_core::execution::{ResourceLimits, DEFAULT_CPUS, DEFAULT_MEM_MB, DEFAULT_TIMEOUT_S};

/// How `shell_exec` reaches a shell inside the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShellMode {
    /// Synthesize interpreter code that spawns the shell and prints its
    /// result as JSON through `POST /run`.
    #[default]
    Wrapped,
    /// Ask the broker to run the shell argv directly through `POST /exec`.
    Native,
}

impl FromStr for ShellMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wrapped" => Ok(Self::Wrapped),
            "native" => Ok(Self::Native),
            other => Err(format!("unknown shell mode '{other}'")),
        }
    }
}

impl fmt::Display for ShellMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wrapped => write!(f, "wrapped"),
            Self::Native => write!(f, "native"),
        }
    }
}

/// Tool configuration loaded from environment variables.
///
/// Built once at startup and handed to each tool; nothing reads the
/// environment after that.
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Broker base URL.
    pub executor_url: String,
    /// Default per-call resource limits.
    pub limits: ResourceLimits,
    /// Extra client-side time allowed on top of `timeout_s` for broker
    /// and container start-up overhead.
    pub client_overhead: Duration,
    pub shell_mode: ShellMode,
}

impl ToolConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                    | Default               |
    /// |----------------------------|-----------------------|
    /// | `PYEXEC_EXECUTOR_URL`      | `http://sandbox:8088` |
    /// | `PYEXEC_TIMEOUT_S`         | `6`                   |
    /// | `PYEXEC_MEM_MB`            | `512`                 |
    /// | `PYEXEC_CPUS`              | `1.0`                 |
    /// | `PYEXEC_CLIENT_OVERHEAD_S` | `3`                   |
    /// | `SHELL_EXEC_MODE`          | `wrapped`             |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let limits = ResourceLimits {
            timeout_s: parse_or(lookup, "PYEXEC_TIMEOUT_S", DEFAULT_TIMEOUT_S)?,
            mem_mb: parse_or(lookup, "PYEXEC_MEM_MB", DEFAULT_MEM_MB)?,
            cpus: parse_or(lookup, "PYEXEC_CPUS", DEFAULT_CPUS)?,
        };
        validate(&limits).map_err(|e| ConfigError::OutOfRange {
            key: "PYEXEC_*",
            reason: e.to_string(),
        })?;

        let overhead_secs: u64 = parse_or(lookup, "PYEXEC_CLIENT_OVERHEAD_S", 3)?;

        Ok(Self {
            executor_url: string_or(lookup, "PYEXEC_EXECUTOR_URL", "http://sandbox:8088"),
            limits,
            client_overhead: Duration::from_secs(overhead_secs),
            shell_mode: parse_or(lookup, "SHELL_EXEC_MODE", ShellMode::Wrapped)?,
        })
    }

    /// HTTP timeout for a call whose sandbox deadline is `timeout_s`.
    pub fn client_timeout(&self, timeout_s: u32) -> Duration {
        Duration::from_secs(u64::from(timeout_s)) + self.client_overhead
    }
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            executor_url: "http://sandbox:8088".to_string(),
            limits: ResourceLimits::default(),
            client_overhead: Duration::from_secs(3),
            shell_mode: ShellMode::Wrapped,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ToolConfig, ConfigError> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        ToolConfig::from_lookup(&|key| map.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.executor_url, "http://sandbox:8088");
        assert_eq!(config.limits, ResourceLimits::default());
        assert_eq!(config.shell_mode, ShellMode::Wrapped);
        assert_eq!(config.client_timeout(6), Duration::from_secs(9));
    }

    #[test]
    fn overrides() {
        let config = config_from(&[
            ("PYEXEC_EXECUTOR_URL", "http://localhost:9000"),
            ("PYEXEC_TIMEOUT_S", "10"),
            ("PYEXEC_CPUS", "0.5"),
            ("SHELL_EXEC_MODE", "Native"),
        ])
        .unwrap();
        assert_eq!(config.executor_url, "http://localhost:9000");
        assert_eq!(config.limits.timeout_s, 10);
        assert!((config.limits.cpus - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.shell_mode, ShellMode::Native);
    }

    #[test]
    fn out_of_range_defaults_are_rejected() {
        let err = config_from(&[("PYEXEC_MEM_MB", "16")]).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn unknown_shell_mode_is_rejected() {
        assert!(config_from(&[("SHELL_EXEC_MODE", "ssh")]).is_err());
    }
}
