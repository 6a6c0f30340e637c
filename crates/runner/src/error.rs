use benchyard_core::archive::ArchiveError;
use benchyard_core::error::CoreError;
use benchyard_core::provisioning::ProvisionError;
use benchyard_core::types::DbId;

/// Errors raised while driving a run through its lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("No secret configured for benchmark {benchmark_id}")]
    MissingSecret { benchmark_id: DbId },

    /// Only uploaded archives are executed; external script links are not.
    #[error("Secret {secret_id} has no packaged script, script links are not supported")]
    ScriptNotPackaged { secret_id: DbId },

    #[error("Failed to unpack script: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A conditional status update matched no row.
    #[error("Run {run_id} is no longer {expected}")]
    StatusConflict { run_id: DbId, expected: &'static str },
}

impl RunError {
    /// Tool output captured before a provisioning failure, if any.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Self::Provision(e) => e.captured_output(),
            _ => None,
        }
    }
}
