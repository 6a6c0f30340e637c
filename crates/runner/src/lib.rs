//! Benchmark run execution: the lifecycle manager, its script workspace
//! and the scheduler that drives it.

pub mod config;
pub mod error;
pub mod jobs;
pub mod lifecycle;
pub mod scheduler;
pub mod workspace;

pub use config::RunnerConfig;
pub use error::RunError;
pub use lifecycle::{ExecuteOutcome, RunLifecycle, TeardownOutcome};
pub use scheduler::{ScheduledJob, Scheduler, SchedulerHandle};
