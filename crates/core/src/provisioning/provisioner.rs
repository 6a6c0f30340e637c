//! Provisioner interface and error type.

use std::path::Path;

use crate::config_map::ConfigMap;

/// Errors returned by a [`Provisioner`].
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// The tool binary could not be started (missing, not executable, ...).
    #[error("Failed to start provisioning tool: {0}")]
    Spawn(std::io::Error),

    /// An I/O error occurred while talking to the child process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The working directory does not exist.
    #[error("Working directory not found: {0}")]
    MissingWorkdir(String),

    /// A provisioning step ran and exited unsuccessfully.
    #[error("`{step}` failed with exit code {exit_code:?}")]
    StepFailed {
        step: &'static str,
        exit_code: Option<i32>,
        /// Tail of the combined stdout/stderr of the failed step.
        output: String,
    },
}

impl ProvisionError {
    /// Output captured from the tool before it failed, if any.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Self::StepFailed { output, .. } if !output.trim().is_empty() => Some(output),
            _ => None,
        }
    }
}

/// Applies and destroys the infrastructure described in a working directory.
///
/// Both calls block until the tool reports success or definitive failure;
/// no timeout is applied.
pub trait Provisioner: Send + Sync {
    /// Initialise the working directory and create its resources.
    fn apply(
        &self,
        workdir: &Path,
        env: ConfigMap,
        vars: ConfigMap,
    ) -> impl std::future::Future<Output = Result<(), ProvisionError>> + Send;

    /// Tear down the resources previously created from `workdir`.
    fn destroy(
        &self,
        workdir: &Path,
        env: ConfigMap,
        vars: ConfigMap,
    ) -> impl std::future::Future<Output = Result<(), ProvisionError>> + Send;
}
