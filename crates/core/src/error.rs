use validator::Validate;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Run the derived bounds checks on a request body.
pub fn validate<T: Validate>(value: &T) -> Result<(), CoreError> {
    value
        .validate()
        .map_err(|errors| CoreError::Validation(errors.to_string()))
}

/// Failures that prevent a sandbox from being launched at all.
///
/// These never describe the sandboxed program itself; a program that runs
/// and fails is reported through its exit code instead.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// The container runtime CLI could not be found on this host.
    #[error("Container runtime '{bin}' not found: {source}")]
    RuntimeNotFound {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    /// Spawning or supervising the runtime process failed.
    #[error("Failed to launch sandbox: {0}")]
    Io(#[from] std::io::Error),
}
