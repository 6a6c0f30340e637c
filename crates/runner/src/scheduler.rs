//! Periodic job scheduler with a single shared execution slot.
//!
//! Every registered job gets its own interval timer, but a job body only
//! runs while holding the scheduler-wide slot. A job whose tick fires while
//! another job runs waits for the slot; it is neither dropped nor run
//! concurrently. Ticks missed while waiting are delayed, not bunched up.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// A side-effecting periodic job. Errors are handled inside [`run`](Self::run).
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn run(&self);
}

/// Builder for a set of periodic jobs sharing one execution slot.
pub struct Scheduler {
    interval: Duration,
    jobs: Vec<Arc<dyn ScheduledJob>>,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            jobs: Vec::new(),
        }
    }

    /// Register a job fired every `interval`.
    pub fn job(mut self, job: Arc<dyn ScheduledJob>) -> Self {
        self.jobs.push(job);
        self
    }

    /// Spawn one task per job. The first tick of each job fires immediately.
    pub fn start(self) -> SchedulerHandle {
        let cancel = CancellationToken::new();
        let slot = Arc::new(Mutex::new(()));

        tracing::info!(
            jobs = self.jobs.len(),
            interval_secs = self.interval.as_secs_f64(),
            "Scheduler started"
        );

        let tasks = self
            .jobs
            .into_iter()
            .map(|job| {
                tokio::spawn(run_job(
                    job,
                    self.interval,
                    Arc::clone(&slot),
                    cancel.clone(),
                ))
            })
            .collect();

        SchedulerHandle { cancel, tasks }
    }
}

async fn run_job(
    job: Arc<dyn ScheduledJob>,
    period: Duration,
    slot: Arc<Mutex<()>>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        let _guard = tokio::select! {
            _ = cancel.cancelled() => break,
            guard = slot.lock() => guard,
        };

        tracing::debug!(job = job.name(), "Running scheduled job");
        job.run().await;
    }

    tracing::info!(job = job.name(), "Scheduled job stopped");
}

/// Running scheduler. Dropping the handle leaves the jobs running.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stop scheduling new ticks and wait for running jobs to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Scheduled job task panicked");
            }
        }
        tracing::info!("Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;

    /// Records how many bodies overlap.
    struct CountingJob {
        name: &'static str,
        active: Arc<AtomicUsize>,
        max_active: Arc<AtomicUsize>,
        runs: AtomicUsize,
        hold: Duration,
    }

    #[async_trait]
    impl ScheduledJob for CountingJob {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn run(&self) {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.hold).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.runs.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn jobs_never_overlap() {
        let active = Arc::new(AtomicUsize::new(0));
        let max_active = Arc::new(AtomicUsize::new(0));
        let make = |name| {
            Arc::new(CountingJob {
                name,
                active: Arc::clone(&active),
                max_active: Arc::clone(&max_active),
                runs: AtomicUsize::new(0),
                hold: Duration::from_millis(15),
            })
        };
        let execute = make("execute");
        let teardown = make("teardown");

        let handle = Scheduler::new(Duration::from_millis(5))
            .job(execute.clone())
            .job(teardown.clone())
            .start();
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.shutdown().await;

        assert_eq!(max_active.load(Ordering::SeqCst), 1);
        assert!(execute.runs.load(Ordering::SeqCst) >= 1);
        assert!(teardown.runs.load(Ordering::SeqCst) >= 1);
    }

    struct SlowJob {
        started: AtomicBool,
        finished: AtomicBool,
    }

    #[async_trait]
    impl ScheduledJob for SlowJob {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn run(&self) {
            self.started.store(true, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn shutdown_waits_for_running_job() {
        let job = Arc::new(SlowJob {
            started: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        });
        let handle = Scheduler::new(Duration::from_secs(60))
            .job(job.clone())
            .start();

        while !job.started.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        handle.shutdown().await;

        assert!(job.finished.load(Ordering::SeqCst));
    }
}
