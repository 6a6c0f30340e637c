//! Scheduler adapters for the lifecycle manager.

use std::sync::Arc;

use async_trait::async_trait;
use benchyard_core::provisioning::Provisioner;
use benchyard_github::ReviewCommentApi;

use crate::lifecycle::{ExecuteOutcome, RunLifecycle};
use crate::scheduler::{ScheduledJob, Scheduler};

/// Starts the next pending run.
pub struct ExecuteJob<P, A> {
    lifecycle: Arc<RunLifecycle<P, A>>,
}

/// Destroys infrastructure of completed runs.
pub struct TeardownJob<P, A> {
    lifecycle: Arc<RunLifecycle<P, A>>,
}

#[async_trait]
impl<P, A> ScheduledJob for ExecuteJob<P, A>
where
    P: Provisioner + 'static,
    A: ReviewCommentApi + 'static,
{
    fn name(&self) -> &'static str {
        "execute"
    }

    async fn run(&self) {
        match self.lifecycle.execute_tick().await {
            Ok(ExecuteOutcome::Failed { run_id }) => {
                tracing::info!(run_id, "Execute tick finished with a failed run");
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Execute tick failed"),
        }
    }
}

#[async_trait]
impl<P, A> ScheduledJob for TeardownJob<P, A>
where
    P: Provisioner + 'static,
    A: ReviewCommentApi + 'static,
{
    fn name(&self) -> &'static str {
        "teardown"
    }

    async fn run(&self) {
        match self.lifecycle.teardown_tick().await {
            Ok(outcome) if !outcome.finished.is_empty() || outcome.failed.is_some() => {
                tracing::info!(
                    finished = ?outcome.finished,
                    failed = ?outcome.failed,
                    "Teardown tick complete"
                );
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Teardown tick failed"),
        }
    }
}

/// Scheduler with the execute and teardown jobs registered.
pub fn lifecycle_scheduler<P, A>(
    lifecycle: Arc<RunLifecycle<P, A>>,
    interval: std::time::Duration,
) -> Scheduler
where
    P: Provisioner + 'static,
    A: ReviewCommentApi + 'static,
{
    Scheduler::new(interval)
        .job(Arc::new(ExecuteJob {
            lifecycle: Arc::clone(&lifecycle),
        }))
        .job(Arc::new(TeardownJob { lifecycle }))
}
