//! Integration tests for the run lifecycle manager.
//!
//! The store is real; the provisioner and the comment transport are fakes
//! that record their calls.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use benchyard_core::config_map::ConfigMap;
use benchyard_core::provisioning::{ProvisionError, Provisioner};
use benchyard_db::models::benchmark::CreateBenchmark;
use benchyard_db::models::run::{CreateRun, Run, RunReport};
use benchyard_db::models::secret::CreateSecret;
use benchyard_db::models::status::RunStatus;
use benchyard_db::repositories::{BenchmarkRepo, ReviewLinkRepo, RunRepo, SecretRepo};
use benchyard_github::{CommentNotifier, GitHubApiError, PullRequestRef, ReviewCommentApi};
use benchyard_runner::lifecycle::{ExecuteOutcome, RunLifecycle, TeardownOutcome};
use benchyard_runner::workspace::ScriptWorkspace;
use sqlx::PgPool;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const DASHBOARD: &str = "https://grafana.example/d/bench?orgId=1";
const PR: &str = "https://github.com/acme/bench/pull/3";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct ProvisionCall {
    kind: &'static str,
    workdir: PathBuf,
    env: ConfigMap,
    vars: ConfigMap,
}

#[derive(Default)]
struct FakeProvisioner {
    calls: Mutex<Vec<ProvisionCall>>,
    /// Output returned in a failed apply.
    fail_apply: Option<String>,
    /// Number of destroys that fail before destroys start succeeding.
    failing_destroys: Mutex<usize>,
    /// Simulates the benchmark callback writing results during apply.
    report_during_apply: Option<(PgPool, RunReport)>,
    /// Moves the run to another status while apply is running.
    status_during_apply: Option<(PgPool, RunStatus)>,
}

impl FakeProvisioner {
    fn calls(&self) -> Vec<ProvisionCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, kind: &'static str, workdir: &Path, env: ConfigMap, vars: ConfigMap) {
        self.calls.lock().unwrap().push(ProvisionCall {
            kind,
            workdir: workdir.to_path_buf(),
            env,
            vars,
        });
    }
}

impl Provisioner for FakeProvisioner {
    async fn apply(&self, workdir: &Path, env: ConfigMap, vars: ConfigMap) -> Result<(), ProvisionError> {
        assert!(workdir.join("main.tf").is_file(), "workdir was not unpacked");
        let run_id: i64 = vars["testrun_id"].parse().unwrap();
        self.record("apply", workdir, env, vars);

        if let Some((pool, report)) = &self.report_during_apply {
            RunRepo::report(pool, run_id, report).await.unwrap();
        }

        if let Some((pool, status)) = &self.status_during_apply {
            sqlx::query("UPDATE runs SET status_id = $2 WHERE id = $1")
                .bind(run_id)
                .bind(status.id())
                .execute(pool)
                .await
                .unwrap();
        }

        match &self.fail_apply {
            Some(output) => Err(ProvisionError::StepFailed {
                step: "terraform apply",
                exit_code: Some(1),
                output: output.clone(),
            }),
            None => Ok(()),
        }
    }

    async fn destroy(&self, workdir: &Path, env: ConfigMap, vars: ConfigMap) -> Result<(), ProvisionError> {
        self.record("destroy", workdir, env, vars);
        let mut failing = self.failing_destroys.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(ProvisionError::StepFailed {
                step: "terraform destroy",
                exit_code: Some(1),
                output: "Error: still in use".into(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct RecordingApi {
    bodies: Mutex<Vec<String>>,
}

impl ReviewCommentApi for RecordingApi {
    fn is_configured(&self) -> bool {
        true
    }

    async fn create_comment(&self, _pr: &PullRequestRef, body: &str) -> Result<String, GitHubApiError> {
        self.bodies.lock().unwrap().push(body.to_string());
        Ok("https://api.github.com/repos/acme/bench/issues/comments/1".into())
    }

    async fn edit_comment(
        &self,
        _pr: &PullRequestRef,
        _comment_id: u64,
        body: &str,
    ) -> Result<(), GitHubApiError> {
        self.bodies.lock().unwrap().push(body.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct Fixture {
    pool: PgPool,
    storage: TempDir,
    benchmark_id: i64,
    secret_id: i64,
}

impl Fixture {
    async fn new(pool: PgPool) -> Self {
        Self::with_script(pool, Some("bench.zip")).await
    }

    async fn with_script(pool: PgPool, script: Option<&str>) -> Self {
        let storage = tempfile::tempdir().unwrap();
        let benchmark = BenchmarkRepo::create(
            &pool,
            &CreateBenchmark {
                owner_id: 1,
                project_id: 1,
                name: "pgbench".into(),
                slug: "pgbench".into(),
                dashboard_url: Some(DASHBOARD.into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let secret = SecretRepo::create(
            &pool,
            &CreateSecret {
                benchmark_id: benchmark.id,
                script: script.map(String::from),
                env: Some(serde_json::json!({ "REGION": "eu-west-1" })),
                vars: Some(serde_json::json!({ "instances": "2", "size": "small" })),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let fixture = Self {
            pool,
            storage,
            benchmark_id: benchmark.id,
            secret_id: secret.id,
        };
        if let Some(script) = script {
            fixture.write_zip(script);
        }
        fixture
    }

    fn workspace(&self) -> ScriptWorkspace {
        ScriptWorkspace::for_secret(self.storage.path(), self.secret_id)
    }

    /// A zip holding a single top-level `bench/` directory.
    fn write_zip(&self, name: &str) {
        let base = self.workspace().base_dir().to_path_buf();
        std::fs::create_dir_all(&base).unwrap();
        let file = std::fs::File::create(base.join(name)).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip.add_directory("bench/", options).unwrap();
        zip.start_file("bench/main.tf", options).unwrap();
        zip.write_all(b"resource \"null_resource\" \"bench\" {}\n").unwrap();
        zip.finish().unwrap();
    }

    async fn run(&self, name: &str) -> Run {
        RunRepo::create(
            &self.pool,
            &CreateRun {
                benchmark_id: self.benchmark_id,
                name: name.into(),
                origin: Some("ci".into()),
                vars: Some(serde_json::json!({ "size": "large" })),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    async fn force_status(&self, run_id: i64, status: RunStatus) {
        sqlx::query("UPDATE runs SET status_id = $2 WHERE id = $1")
            .bind(run_id)
            .bind(status.id())
            .execute(&self.pool)
            .await
            .unwrap();
    }

    async fn status(&self, run_id: i64) -> RunStatus {
        let run = RunRepo::find_by_id(&self.pool, run_id).await.unwrap().unwrap();
        RunStatus::from_id(run.status_id).unwrap()
    }

    async fn link_pr(&self, run_id: i64) {
        let link = ReviewLinkRepo::upsert_body(&self.pool, PR, "queued").await.unwrap();
        RunRepo::set_review_link(&self.pool, run_id, link.id).await.unwrap();
    }

    fn lifecycle(
        &self,
        provisioner: FakeProvisioner,
    ) -> RunLifecycle<FakeProvisioner, RecordingApi> {
        let notifier = Arc::new(CommentNotifier::new(self.pool.clone(), RecordingApi::default()));
        RunLifecycle::new(self.pool.clone(), provisioner, notifier, self.storage.path())
    }
}

// ---------------------------------------------------------------------------
// Execute
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn idle_when_nothing_is_pending(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let lifecycle = fx.lifecycle(FakeProvisioner::default());

    assert_eq!(lifecycle.execute_tick().await.unwrap(), ExecuteOutcome::Idle);
    assert!(lifecycle.provisioner().calls().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn busy_guard_skips_tick(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let in_flight = fx.run("previous").await;
    fx.force_status(in_flight.id, RunStatus::Success).await;
    let waiting = fx.run("next").await;

    let lifecycle = fx.lifecycle(FakeProvisioner::default());
    assert_eq!(
        lifecycle.execute_tick().await.unwrap(),
        ExecuteOutcome::Busy { pending: 1 }
    );
    assert_eq!(fx.status(waiting.id).await, RunStatus::Pending);
    assert!(lifecycle.provisioner().calls().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn oldest_pending_run_is_applied(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let newer = fx.run("newer").await;
    let older = fx.run("older").await;
    sqlx::query("UPDATE runs SET triggered_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(older.id)
        .execute(&fx.pool)
        .await
        .unwrap();

    let lifecycle = fx.lifecycle(FakeProvisioner::default());
    assert_eq!(
        lifecycle.execute_tick().await.unwrap(),
        ExecuteOutcome::Succeeded { run_id: older.id }
    );
    assert_eq!(fx.status(older.id).await, RunStatus::Success);
    assert_eq!(fx.status(newer.id).await, RunStatus::Pending);

    let calls = lifecycle.provisioner().calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert_eq!(call.kind, "apply");
    assert_eq!(call.workdir, fx.workspace().work_dir());
    assert_eq!(call.env["REGION"], "eu-west-1");
    assert_eq!(call.vars["instances"], "2");
    assert_eq!(call.vars["size"], "large");
    assert_eq!(call.vars["testrun_name"], "older");
    assert_eq!(call.vars["test_origin"], "ci");
    assert_eq!(call.vars["benchmark_id"], fx.benchmark_id.to_string());
    assert!(!fx.workspace().temp_dir().exists());

    // The finished run now blocks the next one.
    assert_matches!(
        lifecycle.execute_tick().await.unwrap(),
        ExecuteOutcome::Busy { pending: 1 }
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_apply_records_captured_output(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let run = fx.run("nightly").await;

    let lifecycle = fx.lifecycle(FakeProvisioner {
        fail_apply: Some("Error: quota exceeded".into()),
        ..Default::default()
    });
    assert_eq!(
        lifecycle.execute_tick().await.unwrap(),
        ExecuteOutcome::Failed { run_id: run.id }
    );

    let stored = RunRepo::find_by_id(&fx.pool, run.id).await.unwrap().unwrap();
    assert_eq!(stored.status_id, RunStatus::Fail.id());
    assert_eq!(stored.output.as_deref(), Some("Error: quota exceeded"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failure_comment_sent_when_marking_fail_misses(pool: PgPool) {
    let fx = Fixture::new(pool.clone()).await;
    let run = fx.run("nightly").await;
    fx.link_pr(run.id).await;

    let lifecycle = fx.lifecycle(FakeProvisioner {
        fail_apply: Some("Error: quota exceeded".into()),
        status_during_apply: Some((pool, RunStatus::Finished)),
        ..Default::default()
    });
    assert_eq!(
        lifecycle.execute_tick().await.unwrap(),
        ExecuteOutcome::Failed { run_id: run.id }
    );

    // Running -> Fail did not apply, but output and comment still go out.
    let stored = RunRepo::find_by_id(&fx.pool, run.id).await.unwrap().unwrap();
    assert_eq!(stored.status_id, RunStatus::Finished.id());
    assert_eq!(stored.output.as_deref(), Some("Error: quota exceeded"));

    let link = ReviewLinkRepo::find_by_link(&fx.pool, PR).await.unwrap().unwrap();
    assert!(link.comment_body.contains("Benchmark Run Failed"));
    assert!(link.comment_body.contains("Error: quota exceeded"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn missing_script_fails_without_provisioning(pool: PgPool) {
    let fx = Fixture::with_script(pool, None).await;
    let run = fx.run("nightly").await;

    let lifecycle = fx.lifecycle(FakeProvisioner::default());
    assert_eq!(
        lifecycle.execute_tick().await.unwrap(),
        ExecuteOutcome::Failed { run_id: run.id }
    );
    assert_eq!(fx.status(run.id).await, RunStatus::Fail);
    assert!(lifecycle.provisioner().calls().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancelled_extraction_fails_run(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let run = fx.run("nightly").await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let lifecycle = fx.lifecycle(FakeProvisioner::default()).with_cancellation(cancel);

    assert_eq!(
        lifecycle.execute_tick().await.unwrap(),
        ExecuteOutcome::Failed { run_id: run.id }
    );
    assert!(lifecycle.provisioner().calls().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn success_comment_uses_reported_results(pool: PgPool) {
    let fx = Fixture::new(pool.clone()).await;
    let run = fx.run("nightly").await;
    fx.link_pr(run.id).await;

    let lifecycle = fx.lifecycle(FakeProvisioner {
        report_during_apply: Some((
            pool,
            RunReport {
                started_at: Some("1000".into()),
                ended_at: Some("4000".into()),
                output: Some("tps = 1234".into()),
                ..Default::default()
            },
        )),
        ..Default::default()
    });
    lifecycle.execute_tick().await.unwrap();

    let link = ReviewLinkRepo::find_by_link(&fx.pool, PR).await.unwrap().unwrap();
    assert!(link.comment_body.contains("Completed Successfully"));
    assert!(link.comment_body.contains("tps = 1234"));
    assert!(link.comment_body.contains(&format!("{DASHBOARD}&from=")));
    assert!(link.comment_body.contains("&var-testrun=nightly"));
    assert!(!link.comment_body.contains("&from=&to="));
    assert!(link.comment_link.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failure_without_output_posts_generic_comment(pool: PgPool) {
    let fx = Fixture::with_script(pool, None).await;
    let run = fx.run("nightly").await;
    fx.link_pr(run.id).await;

    let lifecycle = fx.lifecycle(FakeProvisioner::default());
    lifecycle.execute_tick().await.unwrap();

    let link = ReviewLinkRepo::find_by_link(&fx.pool, PR).await.unwrap().unwrap();
    assert!(link.comment_body.contains("Something Went Wrong"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn run_without_review_link_sends_no_comment(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    fx.run("nightly").await;

    let lifecycle = fx.lifecycle(FakeProvisioner::default());
    lifecycle.execute_tick().await.unwrap();

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM review_links")
        .fetch_one(&fx.pool)
        .await
        .unwrap();
    assert_eq!(count.0, 0);
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn teardown_finishes_and_freezes_window(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let run = fx.run("nightly").await;
    fx.force_status(run.id, RunStatus::Success).await;
    RunRepo::report(
        &fx.pool,
        run.id,
        &RunReport {
            started_at: Some("1000".into()),
            ended_at: Some("4000".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    std::fs::create_dir_all(fx.workspace().work_dir()).unwrap();

    let lifecycle = fx.lifecycle(FakeProvisioner::default());
    let outcome = lifecycle.teardown_tick().await.unwrap();
    assert_eq!(
        outcome,
        TeardownOutcome {
            finished: vec![run.id],
            failed: None,
        }
    );

    let stored = RunRepo::find_by_id(&fx.pool, run.id).await.unwrap().unwrap();
    assert_eq!(stored.status_id, RunStatus::Finished.id());
    let started: i64 = stored.started_at.unwrap().parse().unwrap();
    let ended: i64 = stored.ended_at.unwrap().parse().unwrap();
    assert_eq!(ended - started, 3000 + 30_000);
    assert!(!fx.workspace().work_dir().exists());

    let calls = lifecycle.provisioner().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].kind, "destroy");
    assert_eq!(calls[0].vars["testrun_id"], run.id.to_string());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn teardown_keeps_unparseable_timestamps(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let run = fx.run("nightly").await;
    fx.force_status(run.id, RunStatus::Fail).await;
    RunRepo::report(
        &fx.pool,
        run.id,
        &RunReport {
            started_at: Some("soon".into()),
            ended_at: Some("4000".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let lifecycle = fx.lifecycle(FakeProvisioner::default());
    lifecycle.teardown_tick().await.unwrap();

    let stored = RunRepo::find_by_id(&fx.pool, run.id).await.unwrap().unwrap();
    assert_eq!(stored.status_id, RunStatus::Finished.id());
    assert_eq!(stored.started_at.as_deref(), Some("soon"));
    assert_eq!(stored.ended_at.as_deref(), Some("4000"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn teardown_stops_at_first_failure(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let first = fx.run("first").await;
    let second = fx.run("second").await;
    sqlx::query("UPDATE runs SET triggered_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(first.id)
        .execute(&fx.pool)
        .await
        .unwrap();
    fx.force_status(first.id, RunStatus::Success).await;
    fx.force_status(second.id, RunStatus::Success).await;

    let lifecycle = fx.lifecycle(FakeProvisioner {
        failing_destroys: Mutex::new(1),
        ..Default::default()
    });

    let outcome = lifecycle.teardown_tick().await.unwrap();
    assert_eq!(
        outcome,
        TeardownOutcome {
            finished: vec![],
            failed: Some(first.id),
        }
    );
    assert_eq!(fx.status(first.id).await, RunStatus::Fail);
    assert_eq!(fx.status(second.id).await, RunStatus::Success);
    assert_eq!(lifecycle.provisioner().calls().len(), 1);

    // Next tick retries both, oldest first.
    let outcome = lifecycle.teardown_tick().await.unwrap();
    assert_eq!(outcome.finished, vec![first.id, second.id]);
    assert_eq!(fx.status(first.id).await, RunStatus::Finished);
    assert_eq!(fx.status(second.id).await, RunStatus::Finished);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn teardown_without_secret_marks_fail(pool: PgPool) {
    let fx = Fixture::new(pool).await;
    let run = fx.run("nightly").await;
    fx.force_status(run.id, RunStatus::Success).await;
    sqlx::query("DELETE FROM secrets")
        .execute(&fx.pool)
        .await
        .unwrap();

    let lifecycle = fx.lifecycle(FakeProvisioner::default());
    let outcome = lifecycle.teardown_tick().await.unwrap();

    assert_eq!(outcome.failed, Some(run.id));
    assert_eq!(fx.status(run.id).await, RunStatus::Fail);
    assert!(lifecycle.provisioner().calls().is_empty());
}
