use std::path::PathBuf;
use std::time::Duration;

/// Runner configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Root of uploaded benchmark scripts (default: `data/storage`).
    pub storage_dir: PathBuf,
    /// Period of the execute and teardown jobs (default: 15 s).
    pub tick_interval: Duration,
    /// Terraform executable (default: `terraform` on `PATH`).
    pub terraform_bin: PathBuf,
}

impl RunnerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var              | Default        |
    /// |----------------------|----------------|
    /// | `STORAGE_DIR`        | `data/storage` |
    /// | `TICK_INTERVAL_SECS` | `15`           |
    /// | `TERRAFORM_BIN`      | `terraform`    |
    pub fn from_env() -> Self {
        let storage_dir = std::env::var("STORAGE_DIR")
            .unwrap_or_else(|_| "data/storage".into())
            .into();

        let tick_interval_secs: u64 = std::env::var("TICK_INTERVAL_SECS")
            .unwrap_or_else(|_| "15".into())
            .parse()
            .expect("TICK_INTERVAL_SECS must be a valid u64");
        assert!(tick_interval_secs > 0, "TICK_INTERVAL_SECS must be positive");

        let terraform_bin = std::env::var("TERRAFORM_BIN")
            .unwrap_or_else(|_| "terraform".into())
            .into();

        Self {
            storage_dir,
            tick_interval: Duration::from_secs(tick_interval_secs),
            terraform_bin,
        }
    }
}
