use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{AnalysisKind, JobStatus};
use super::report::views::ComparisonQuery;
use super::repository::{AnalysisRepository, CandidateWorkspace};
use super::scoring::ScoringOracle;
use super::service::{AnalysisRequest, AnalysisServiceError, MatchAnalysisService};
use super::weights::WeightInput;
use crate::error::analysis_status;

type SharedService<R, W, O> = Arc<MatchAnalysisService<R, W, O>>;

/// Router builder exposing analysis, history, and aggregation endpoints.
pub fn analysis_router<R, W, O>(service: SharedService<R, W, O>) -> Router
where
    R: AnalysisRepository + 'static,
    W: CandidateWorkspace + 'static,
    O: ScoringOracle + 'static,
{
    Router::new()
        .route(
            "/api/v1/jobs/:job_id/analysis",
            post(analyze_handler::<R, W, O>),
        )
        .route(
            "/api/v1/jobs/:job_id/analysis/history",
            get(history_handler::<R, W, O>),
        )
        .route(
            "/api/v1/jobs/:job_id/skills-gap/progress",
            get(progress_handler::<R, W, O>),
        )
        .route(
            "/api/v1/analysis/comparison",
            get(comparison_handler::<R, W, O>),
        )
        .route("/api/v1/analysis/trends", get(trends_handler::<R, W, O>))
        .route("/api/v1/analysis/export", post(export_handler::<R, W, O>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalyzeBody {
    #[serde(default)]
    user_id: String,
    kind: String,
    #[serde(default)]
    weights: Option<WeightInput>,
    #[serde(default)]
    force_refresh: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserParams {
    #[serde(default)]
    user_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryParams {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ComparisonParams {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    min_score: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExportBody {
    #[serde(default)]
    user_id: String,
    #[serde(default)]
    job_ids: Vec<String>,
}

fn error_response(error: AnalysisServiceError) -> Response {
    let payload = json!({
        "error": error.to_string(),
    });
    (analysis_status(&error), axum::Json(payload)).into_response()
}

fn bad_request(message: String) -> Response {
    error_response(AnalysisServiceError::Validation(message))
}

/// Runs a synchronous service call on the blocking pool, off the async workers.
async fn run_blocking<T, F>(task: F) -> Result<T, Response>
where
    F: FnOnce() -> Result<T, AnalysisServiceError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(error_response(err)),
        Err(join_error) => {
            error!(error = %join_error, "analysis task aborted");
            let payload = json!({ "error": "analysis task failed" });
            Err((StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response())
        }
    }
}

pub(crate) async fn analyze_handler<R, W, O>(
    State(service): State<SharedService<R, W, O>>,
    Path(job_id): Path<String>,
    axum::Json(body): axum::Json<AnalyzeBody>,
) -> Response
where
    R: AnalysisRepository + 'static,
    W: CandidateWorkspace + 'static,
    O: ScoringOracle + 'static,
{
    let Some(kind) = AnalysisKind::parse(&body.kind) else {
        return bad_request(format!("unknown analysis kind '{}'", body.kind));
    };

    let request = AnalysisRequest {
        kind,
        job_id,
        user_id: body.user_id,
        weights: body.weights,
        force_refresh: body.force_refresh,
    };

    match run_blocking(move || service.get_or_compute(request)).await {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn history_handler<R, W, O>(
    State(service): State<SharedService<R, W, O>>,
    Path(job_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Response
where
    R: AnalysisRepository + 'static,
    W: CandidateWorkspace + 'static,
    O: ScoringOracle + 'static,
{
    let requested = job_id.clone();
    let history =
        run_blocking(move || service.history(&requested, &params.user_id, params.limit)).await;
    match history {
        Ok(entries) => {
            let payload = json!({
                "jobId": job_id.trim(),
                "count": entries.len(),
                "history": entries,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn progress_handler<R, W, O>(
    State(service): State<SharedService<R, W, O>>,
    Path(job_id): Path<String>,
    Query(params): Query<UserParams>,
) -> Response
where
    R: AnalysisRepository + 'static,
    W: CandidateWorkspace + 'static,
    O: ScoringOracle + 'static,
{
    match run_blocking(move || service.progress(&job_id, &params.user_id)).await {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn comparison_handler<R, W, O>(
    State(service): State<SharedService<R, W, O>>,
    Query(params): Query<ComparisonParams>,
) -> Response
where
    R: AnalysisRepository + 'static,
    W: CandidateWorkspace + 'static,
    O: ScoringOracle + 'static,
{
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => match JobStatus::parse(raw) {
            Some(status) => Some(status),
            None => return bad_request(format!("unknown job status '{raw}'")),
        },
    };

    let query = ComparisonQuery {
        status,
        limit: params.limit,
        min_score: params.min_score,
    };

    match run_blocking(move || service.comparison(&params.user_id, query)).await {
        Ok(rows) => {
            let payload = json!({
                "count": rows.len(),
                "jobs": rows,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(response) => response,
    }
}

pub(crate) async fn trends_handler<R, W, O>(
    State(service): State<SharedService<R, W, O>>,
    Query(params): Query<UserParams>,
) -> Response
where
    R: AnalysisRepository + 'static,
    W: CandidateWorkspace + 'static,
    O: ScoringOracle + 'static,
{
    match run_blocking(move || service.trends(&params.user_id)).await {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn export_handler<R, W, O>(
    State(service): State<SharedService<R, W, O>>,
    axum::Json(body): axum::Json<ExportBody>,
) -> Response
where
    R: AnalysisRepository + 'static,
    W: CandidateWorkspace + 'static,
    O: ScoringOracle + 'static,
{
    match run_blocking(move || service.export_csv(&body.user_id, &body.job_ids)).await {
        Ok(csv) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"analysis-export.csv\"",
                ),
            ],
            csv,
        )
            .into_response(),
        Err(response) => response,
    }
}
