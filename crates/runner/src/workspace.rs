//! On-disk layout of a benchmark's script.
//!
//! ```text
//! <storage_dir>/secrets/<secret_id>/
//!     <script archive>
//!     script_temp/       extraction scratch space
//!     script_unpacked/   working directory handed to the provisioner
//! ```

use std::path::{Path, PathBuf};

use benchyard_core::archive;
use benchyard_core::types::DbId;
use tokio_util::sync::CancellationToken;

use crate::error::RunError;

pub const SECRETS_DIR: &str = "secrets";
pub const UNPACKED_DIR: &str = "script_unpacked";
pub const TEMP_DIR: &str = "script_temp";

/// Paths belonging to one secret's script.
#[derive(Debug, Clone)]
pub struct ScriptWorkspace {
    base: PathBuf,
}

impl ScriptWorkspace {
    pub fn for_secret(storage_dir: &Path, secret_id: DbId) -> Self {
        Self {
            base: storage_dir.join(SECRETS_DIR).join(secret_id.to_string()),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    pub fn work_dir(&self) -> PathBuf {
        self.base.join(UNPACKED_DIR)
    }

    pub fn temp_dir(&self) -> PathBuf {
        self.base.join(TEMP_DIR)
    }

    /// Unpack `script` into a fresh working directory on the blocking pool.
    pub async fn prepare(
        &self,
        script: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, RunError> {
        let source = self.base.join(script);
        let temp_dir = self.temp_dir();
        let work_dir = self.work_dir();
        let cancel = cancel.clone();

        tracing::info!(wd = %work_dir.display(), "Unpacking script");
        let work_dir = tokio::task::spawn_blocking(move || {
            archive::materialize(&source, &temp_dir, &work_dir, &cancel)
        })
        .await??;
        Ok(work_dir)
    }

    /// Delete the working directory. A missing directory is not an error.
    pub async fn remove(&self) -> std::io::Result<()> {
        let work_dir = self.work_dir();
        tokio::task::spawn_blocking(move || archive::remove_dir_if_exists(&work_dir))
            .await
            .map_err(std::io::Error::other)?
    }
}
