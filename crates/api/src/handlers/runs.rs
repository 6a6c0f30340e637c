//! Handlers for the `/runs` resource.
//!
//! Enqueueing only records a pending run. The runner's execute job picks
//! it up on a later tick.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use benchyard_core::comments::in_progress_comment;
use benchyard_core::dashboard::pending_dashboard_url;
use benchyard_core::error::CoreError;
use benchyard_core::naming::{normalize_origin, normalize_run_name};
use benchyard_core::types::DbId;
use benchyard_db::models::run::{CreateRun, Run, RunListQuery, RunReport};
use benchyard_db::models::status::RunStatus;
use benchyard_db::repositories::{BenchmarkRepo, RunRepo};
use benchyard_github::links::parse_pr_link;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequirePrivileged;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /api/v1/runs`.
#[derive(Debug, Deserialize)]
pub struct EnqueueRunRequest {
    pub benchmark_id: Option<DbId>,
    pub name: Option<String>,
    pub origin: Option<String>,
    pub comment: Option<String>,
    /// Terraform variable overrides for this run.
    pub vars: Option<serde_json::Value>,
    pub meta: Option<serde_json::Value>,
    /// Pull request that receives progress comments.
    pub pr_link: Option<String>,
}

/// POST /api/v1/runs
///
/// Persist a pending run. When `pr_link` is given the in-progress comment
/// is sent before responding; if that fails the run stays queued and the
/// request answers 502.
pub async fn enqueue_run(
    RequirePrivileged(user): RequirePrivileged,
    State(state): State<AppState>,
    Json(input): Json<EnqueueRunRequest>,
) -> AppResult<impl IntoResponse> {
    let (benchmark_id, raw_name) = match (input.benchmark_id, input.name.as_deref()) {
        (Some(id), Some(name)) if !name.trim().is_empty() => (id, name),
        _ => {
            return Err(AppError::BadRequest(
                "missing required fields: benchmark_id, name".into(),
            ))
        }
    };
    let name = normalize_run_name(raw_name)?;
    let origin = normalize_origin(input.origin.as_deref());

    let pr_link = input
        .pr_link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());
    if let Some(link) = pr_link {
        parse_pr_link(link).map_err(|e| CoreError::Validation(e.to_string()))?;
    }

    let benchmark = BenchmarkRepo::find_by_id(&state.pool, benchmark_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Benchmark",
            id: benchmark_id,
        })?;

    let run = RunRepo::create(
        &state.pool,
        &CreateRun {
            benchmark_id,
            name,
            origin,
            comment: input.comment,
            vars: input.vars,
            meta: input.meta,
        },
    )
    .await?;
    tracing::info!(
        run_id = run.id,
        benchmark_id,
        name = %run.name,
        subject = %user.subject,
        "Run enqueued"
    );

    let run = match pr_link {
        Some(link) => {
            let base = benchmark.dashboard_url.as_deref().unwrap_or_default();
            let body = in_progress_comment(&pending_dashboard_url(base, &run.name));
            let review_link = state.notifier.add_or_update_comment(link, &body).await?;
            RunRepo::set_review_link(&state.pool, run.id, review_link.id)
                .await?
                .ok_or(CoreError::NotFound {
                    entity: "Run",
                    id: run.id,
                })?
        }
        None => run,
    };

    Ok((StatusCode::CREATED, Json(DataResponse { data: run })))
}

/// GET /api/v1/runs?status=pending&limit=50&offset=0
pub async fn list_runs(
    RequirePrivileged(_user): RequirePrivileged,
    State(state): State<AppState>,
    Query(params): Query<RunListQuery>,
) -> AppResult<Json<DataResponse<Vec<Run>>>> {
    let status = params
        .status
        .as_deref()
        .map(|s| {
            RunStatus::from_name(s)
                .ok_or_else(|| AppError::BadRequest(format!("unknown run status '{s}'")))
        })
        .transpose()?;

    let runs = RunRepo::list(&state.pool, status, params.limit, params.offset).await?;
    Ok(Json(DataResponse { data: runs }))
}

/// GET /api/v1/runs/{id}
pub async fn get_run(
    RequirePrivileged(_user): RequirePrivileged,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Run>>> {
    let run = RunRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(CoreError::NotFound { entity: "Run", id })?;
    Ok(Json(DataResponse { data: run }))
}

/// POST /api/v1/runs/{id}/report
///
/// Callback from the benchmark script. Merges timestamps and results;
/// the run's status is left to the runner.
pub async fn report_run(
    RequirePrivileged(_user): RequirePrivileged,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<RunReport>,
) -> AppResult<Json<DataResponse<Run>>> {
    let run = RunRepo::report(&state.pool, id, &input)
        .await?
        .ok_or(CoreError::NotFound { entity: "Run", id })?;
    tracing::info!(run_id = id, "Run results reported");
    Ok(Json(DataResponse { data: run }))
}
