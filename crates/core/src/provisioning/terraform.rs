//! Terraform-backed [`Provisioner`].
//!
//! `apply` runs `terraform init -upgrade` followed by `terraform apply`;
//! `destroy` runs `terraform destroy` against an already initialised
//! directory. Both layer the orchestrator's operational credentials on top
//! of the caller's environment and variables.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use super::provisioner::{ProvisionError, Provisioner};
use super::subprocess::run_streaming;
use crate::config_map::ConfigMap;

/// Upper bound on concurrent resource operations per apply/destroy.
pub const PARALLELISM: u32 = 25;

pub const ENV_AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_CALLBACK_TOKEN: &str = "BENCHYARD_TOKEN";
pub const ENV_CALLBACK_URI: &str = "BENCHYARD_URI";

pub const VAR_CLOUD_TOKEN: &str = "fly_access_token";
pub const VAR_PRIVATE_KEY_LOCATION: &str = "private_key_location";
pub const VAR_CALLBACK_TOKEN: &str = "benchyard_token";
pub const VAR_CALLBACK_URI: &str = "benchyard_uri";

/// Operational credentials injected into every terraform invocation.
#[derive(Debug, Clone, Default)]
pub struct ProvisionerCredentials {
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Token the benchmark uses to report results back to this service.
    pub callback_token: String,
    /// Base URI of this service as seen from provisioned machines.
    pub callback_uri: String,
    pub cloud_token: String,
    pub private_key_location: String,
}

impl ProvisionerCredentials {
    /// Load credentials from environment variables. Missing values are empty.
    ///
    /// | Env Var                 | Field                   |
    /// |-------------------------|-------------------------|
    /// | `AWS_ACCESS_KEY_ID`     | `aws_access_key_id`     |
    /// | `AWS_SECRET_ACCESS_KEY` | `aws_secret_access_key` |
    /// | `BENCHYARD_TOKEN`       | `callback_token`        |
    /// | `BENCHYARD_URI`         | `callback_uri`          |
    /// | `FLY_TOKEN`             | `cloud_token`           |
    /// | `PRIVATE_KEY_LOCATION`  | `private_key_location`  |
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).unwrap_or_default();
        Self {
            aws_access_key_id: var(ENV_AWS_ACCESS_KEY_ID),
            aws_secret_access_key: var(ENV_AWS_SECRET_ACCESS_KEY),
            callback_token: var(ENV_CALLBACK_TOKEN),
            callback_uri: var(ENV_CALLBACK_URI),
            cloud_token: var("FLY_TOKEN"),
            private_key_location: var("PRIVATE_KEY_LOCATION"),
        }
    }

    /// Overwrite the credential keys in a caller-supplied environment.
    pub fn enrich_env(&self, env: &mut ConfigMap) {
        env.insert(ENV_AWS_ACCESS_KEY_ID.into(), self.aws_access_key_id.clone());
        env.insert(ENV_AWS_SECRET_ACCESS_KEY.into(), self.aws_secret_access_key.clone());
        env.insert(ENV_CALLBACK_TOKEN.into(), self.callback_token.clone());
        env.insert(ENV_CALLBACK_URI.into(), self.callback_uri.clone());
    }

    /// Overwrite the credential keys in a caller-supplied variable map.
    pub fn enrich_vars(&self, vars: &mut ConfigMap) {
        vars.insert(VAR_CLOUD_TOKEN.into(), self.cloud_token.clone());
        vars.insert(VAR_PRIVATE_KEY_LOCATION.into(), self.private_key_location.clone());
        vars.insert(VAR_CALLBACK_TOKEN.into(), self.callback_token.clone());
        vars.insert(VAR_CALLBACK_URI.into(), self.callback_uri.clone());
    }
}

/// Drives the `terraform` CLI.
#[derive(Debug, Clone)]
pub struct TerraformProvisioner {
    binary: PathBuf,
    credentials: ProvisionerCredentials,
}

impl TerraformProvisioner {
    pub fn new(binary: impl Into<PathBuf>, credentials: ProvisionerCredentials) -> Self {
        Self {
            binary: binary.into(),
            credentials,
        }
    }

    /// Arguments for `terraform init`.
    pub fn init_args() -> Vec<String> {
        ["init", "-upgrade", "-input=false", "-no-color"]
            .map(String::from)
            .to_vec()
    }

    /// Arguments for `terraform apply` with the given variables.
    pub fn apply_args(vars: &ConfigMap) -> Vec<String> {
        Self::mutating_args("apply", vars)
    }

    /// Arguments for `terraform destroy` with the given variables.
    pub fn destroy_args(vars: &ConfigMap) -> Vec<String> {
        Self::mutating_args("destroy", vars)
    }

    fn mutating_args(subcommand: &str, vars: &ConfigMap) -> Vec<String> {
        let mut args = vec![
            subcommand.to_string(),
            "-auto-approve".into(),
            "-input=false".into(),
            "-no-color".into(),
            format!("-parallelism={PARALLELISM}"),
        ];
        for (key, value) in vars {
            args.push("-var".into());
            args.push(format!("{key}={value}"));
        }
        args
    }

    async fn run_step(
        &self,
        label: &'static str,
        workdir: &Path,
        env: &ConfigMap,
        args: &[String],
    ) -> Result<(), ProvisionError> {
        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(workdir)
            .args(args)
            .envs(env)
            .env("TF_IN_AUTOMATION", "1");

        let output = run_streaming(&mut cmd, label).await?;
        if output.success {
            Ok(())
        } else {
            Err(ProvisionError::StepFailed {
                step: label,
                exit_code: output.exit_code,
                output: output.tail,
            })
        }
    }

    fn prepare(
        &self,
        workdir: &Path,
        mut env: ConfigMap,
        mut vars: ConfigMap,
    ) -> Result<(ConfigMap, ConfigMap), ProvisionError> {
        if !workdir.is_dir() {
            return Err(ProvisionError::MissingWorkdir(workdir.display().to_string()));
        }
        self.credentials.enrich_env(&mut env);
        self.credentials.enrich_vars(&mut vars);
        Ok((env, vars))
    }
}

impl Provisioner for TerraformProvisioner {
    async fn apply(&self, workdir: &Path, env: ConfigMap, vars: ConfigMap) -> Result<(), ProvisionError> {
        let (env, vars) = self.prepare(workdir, env, vars)?;

        tracing::info!(path = %workdir.display(), "Initialising terraform");
        self.run_step("terraform init", workdir, &env, &Self::init_args())
            .await?;

        tracing::info!(path = %workdir.display(), "Applying terraform");
        self.run_step("terraform apply", workdir, &env, &Self::apply_args(&vars))
            .await
    }

    async fn destroy(&self, workdir: &Path, env: ConfigMap, vars: ConfigMap) -> Result<(), ProvisionError> {
        let (env, vars) = self.prepare(workdir, env, vars)?;

        tracing::info!(path = %workdir.display(), "Destroying terraform");
        self.run_step("terraform destroy", workdir, &env, &Self::destroy_args(&vars))
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
