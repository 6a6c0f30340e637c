//! Run lifecycle manager.
//!
//! Two entry points are driven by the scheduler:
//!
//! - [`RunLifecycle::execute_tick`] picks the oldest pending run (unless
//!   another run is still in flight), unpacks its script, applies the
//!   infrastructure and records the outcome.
//! - [`RunLifecycle::teardown_tick`] destroys the infrastructure of runs
//!   that succeeded or failed and marks them finished.
//!
//! Pull request comments are sent after the outcome is stored. Comment
//! failures are logged and never change a run's status.

use std::path::PathBuf;
use std::sync::Arc;

use benchyard_core::comments::{failure_comment, generic_failure_comment, success_comment};
use benchyard_core::dashboard::{dashboard_url, now_millis, synthesize_window};
use benchyard_core::provisioning::Provisioner;
use benchyard_core::run_vars::{build_run_maps, RunConfigSources, RunIdentity, RunMaps};
use benchyard_core::types::DbId;
use benchyard_db::models::run::Run;
use benchyard_db::models::secret::Secret;
use benchyard_db::models::status::RunStatus;
use benchyard_db::repositories::{BenchmarkRepo, RunRepo, SecretRepo};
use benchyard_github::{CommentNotifier, NotifyError, ReviewCommentApi};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::error::RunError;
use crate::workspace::ScriptWorkspace;

/// What an execute tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// Another run is running or awaiting teardown.
    Busy { pending: i64 },
    /// Nothing is pending.
    Idle,
    Succeeded { run_id: DbId },
    Failed { run_id: DbId },
}

/// What a teardown tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeardownOutcome {
    /// Runs torn down and marked finished, in processing order.
    pub finished: Vec<DbId>,
    /// The run whose teardown failed. Processing stops at this run.
    pub failed: Option<DbId>,
}

/// Where a run's comment goes and what dashboard it links to.
struct NotificationContext {
    pr_link: String,
    dashboard_base: String,
}

/// Drives benchmark runs from pending to finished.
pub struct RunLifecycle<P, A> {
    pool: PgPool,
    provisioner: P,
    notifier: Arc<CommentNotifier<A>>,
    storage_dir: PathBuf,
    cancel: CancellationToken,
}

impl<P: Provisioner, A: ReviewCommentApi> RunLifecycle<P, A> {
    pub fn new(
        pool: PgPool,
        provisioner: P,
        notifier: Arc<CommentNotifier<A>>,
        storage_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            pool,
            provisioner,
            notifier,
            storage_dir: storage_dir.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// Abort script extraction when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn provisioner(&self) -> &P {
        &self.provisioner
    }

    // -----------------------------------------------------------------------
    // Execute
    // -----------------------------------------------------------------------

    /// Start the oldest pending run if no other run is in flight.
    pub async fn execute_tick(&self) -> Result<ExecuteOutcome, RunError> {
        let busy = RunRepo::count_with_status(&self.pool, &RunStatus::BUSY).await?;
        let pending = RunRepo::count_with_status(&self.pool, &[RunStatus::Pending]).await?;

        if busy > 0 {
            tracing::info!(queue = pending, "A benchmark is still in flight, skipping");
            return Ok(ExecuteOutcome::Busy { pending });
        }

        let Some(run) = RunRepo::oldest_pending(&self.pool).await? else {
            tracing::debug!("No pending benchmarks");
            return Ok(ExecuteOutcome::Idle);
        };

        tracing::info!(
            queue = pending,
            run_id = run.id,
            benchmark_id = run.benchmark_id,
            name = %run.name,
            "Running benchmark"
        );
        self.set_status(run.id, RunStatus::Pending, RunStatus::Running)
            .await?;

        let outcome = match self.apply_run(&run).await {
            Ok(()) => {
                self.set_status(run.id, RunStatus::Running, RunStatus::Success)
                    .await?;
                tracing::info!(run_id = run.id, name = %run.name, "Benchmark succeeded");
                ExecuteOutcome::Succeeded { run_id: run.id }
            }
            Err(e) => {
                tracing::error!(run_id = run.id, name = %run.name, error = %e, "Benchmark failed");
                self.record_failure(run.id, e.captured_output()).await;
                ExecuteOutcome::Failed { run_id: run.id }
            }
        };

        self.notify_outcome(run.id, outcome).await;
        Ok(outcome)
    }

    async fn apply_run(&self, run: &Run) -> Result<(), RunError> {
        let secret = self.secret_for(run).await?;
        let script = secret
            .packaged_script()
            .ok_or(RunError::ScriptNotPackaged {
                secret_id: secret.id,
            })?;

        let workspace = ScriptWorkspace::for_secret(&self.storage_dir, secret.id);
        let workdir = workspace.prepare(script, &self.cancel).await?;

        let maps = run_maps(run, &secret);
        self.provisioner.apply(&workdir, maps.env, maps.vars).await?;
        Ok(())
    }

    /// Mark the run failed and keep the provisioner output. Best effort:
    /// errors are logged and the failure comment is still sent.
    async fn record_failure(&self, run_id: DbId, output: Option<&str>) {
        if let Err(e) = self
            .set_status(run_id, RunStatus::Running, RunStatus::Fail)
            .await
        {
            tracing::error!(run_id, error = %e, "Failed to mark run as failed");
        }

        if let Some(output) = output {
            if let Err(e) = RunRepo::record_output_if_empty(&self.pool, run_id, output).await {
                tracing::error!(run_id, error = %e, "Failed to record run output");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Destroy infrastructure of every run awaiting teardown, oldest first.
    ///
    /// The first failure marks that run failed and ends the tick; the
    /// remaining runs are retried on the next tick.
    pub async fn teardown_tick(&self) -> Result<TeardownOutcome, RunError> {
        let runs = RunRepo::list_with_status(&self.pool, &RunStatus::AWAITING_TEARDOWN).await?;
        let mut outcome = TeardownOutcome::default();
        if runs.is_empty() {
            return Ok(outcome);
        }

        if runs.len() > 1 {
            tracing::warn!(count = runs.len(), "More than one benchmark awaiting teardown");
        }

        for run in runs {
            let Some(current) = RunStatus::from_id(run.status_id) else {
                continue;
            };
            tracing::info!(
                run_id = run.id,
                benchmark_id = run.benchmark_id,
                name = %run.name,
                "Tearing down benchmark"
            );

            let workspace = match self.destroy_run(&run).await {
                Ok(workspace) => workspace,
                Err(e) => {
                    tracing::error!(run_id = run.id, name = %run.name, error = %e, "Teardown failed");
                    self.set_status(run.id, current, RunStatus::Fail).await?;
                    outcome.failed = Some(run.id);
                    return Ok(outcome);
                }
            };

            let window = synthesize_window(
                run.started_at.as_deref(),
                run.ended_at.as_deref(),
                now_millis(),
            );
            if let Some(window) = window {
                RunRepo::set_timestamps(
                    &self.pool,
                    run.id,
                    &window.from.to_string(),
                    &window.to.to_string(),
                )
                .await?;
            }
            self.set_status(run.id, current, RunStatus::Finished)
                .await?;
            outcome.finished.push(run.id);

            if let Err(e) = workspace.remove().await {
                tracing::warn!(
                    run_id = run.id,
                    path = %workspace.work_dir().display(),
                    error = %e,
                    "Failed to remove working directory"
                );
            }
        }

        Ok(outcome)
    }

    async fn destroy_run(&self, run: &Run) -> Result<ScriptWorkspace, RunError> {
        let secret = self.secret_for(run).await?;
        let workspace = ScriptWorkspace::for_secret(&self.storage_dir, secret.id);

        let maps = run_maps(run, &secret);
        self.provisioner
            .destroy(&workspace.work_dir(), maps.env, maps.vars)
            .await?;
        Ok(workspace)
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    async fn notify_outcome(&self, run_id: DbId, outcome: ExecuteOutcome) {
        // Re-read: the benchmark callback may have written output and
        // timestamps while the infrastructure was being applied.
        let run = match RunRepo::find_by_id(&self.pool, run_id).await {
            Ok(Some(run)) => run,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(run_id, error = %e, "Failed to reload run for notification");
                return;
            }
        };

        let Some(context) = self.notification_context(&run).await else {
            return;
        };

        let window = synthesize_window(
            run.started_at.as_deref(),
            run.ended_at.as_deref(),
            now_millis(),
        );
        let url = dashboard_url(&context.dashboard_base, window.as_ref(), &run.name);
        let output = run.output.as_deref().filter(|o| !o.trim().is_empty());

        let body = match (outcome, output) {
            (ExecuteOutcome::Succeeded { .. }, output) => success_comment(&url, output.unwrap_or("")),
            (ExecuteOutcome::Failed { .. }, Some(output)) => failure_comment(&url, output),
            (ExecuteOutcome::Failed { .. }, None) => generic_failure_comment(),
            _ => return,
        };

        match self
            .notifier
            .add_or_update_comment(&context.pr_link, &body)
            .await
        {
            Ok(_) => {}
            Err(NotifyError::NotConfigured) => {
                tracing::debug!(run_id, "GitHub client not configured, comment skipped");
            }
            Err(e) => {
                tracing::warn!(run_id, pr_link = %context.pr_link, error = %e, "Failed to update pull request comment");
            }
        }
    }

    async fn notification_context(&self, run: &Run) -> Option<NotificationContext> {
        let link_id = run.review_link_id?;

        let link = match self.notifier.find_link_by_id(link_id).await {
            Ok(Some(link)) => link,
            Ok(None) => {
                tracing::warn!(run_id = run.id, review_link_id = link_id, "Review link not found");
                return None;
            }
            Err(e) => {
                tracing::warn!(run_id = run.id, review_link_id = link_id, error = %e, "Failed to get review link");
                return None;
            }
        };

        let benchmark = match BenchmarkRepo::find_by_id(&self.pool, run.benchmark_id).await {
            Ok(Some(benchmark)) => benchmark,
            Ok(None) => {
                tracing::warn!(run_id = run.id, benchmark_id = run.benchmark_id, "Benchmark not found");
                return None;
            }
            Err(e) => {
                tracing::warn!(run_id = run.id, benchmark_id = run.benchmark_id, error = %e, "Failed to get dashboard URL");
                return None;
            }
        };

        Some(NotificationContext {
            pr_link: link.pr_link,
            dashboard_base: benchmark.dashboard_url.unwrap_or_default(),
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn secret_for(&self, run: &Run) -> Result<Secret, RunError> {
        SecretRepo::find_by_benchmark(&self.pool, run.benchmark_id)
            .await?
            .ok_or(RunError::MissingSecret {
                benchmark_id: run.benchmark_id,
            })
    }

    async fn set_status(&self, run_id: DbId, from: RunStatus, to: RunStatus) -> Result<(), RunError> {
        let step = from.transition_to(to)?;
        if !RunRepo::transition(&self.pool, run_id, step).await? {
            return Err(RunError::StatusConflict {
                run_id,
                expected: from.name(),
            });
        }
        Ok(())
    }
}

fn run_maps(run: &Run, secret: &Secret) -> RunMaps {
    build_run_maps(
        RunConfigSources {
            secret_env: secret.env.as_ref(),
            secret_vars: secret.vars.as_ref(),
            run_vars: run.vars.as_ref(),
        },
        &RunIdentity {
            benchmark_id: run.benchmark_id,
            run_id: run.id,
            name: &run.name,
            origin: run.origin.as_deref(),
        },
    )
}
