//! API handlers
//!
//! Pipeline runs are CPU-bound and synchronous, so they go through
//! `tokio::task::spawn_blocking` instead of running on the async workers.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::pipeline::AnalysisPipeline;
use crate::report::export::ExportFormat;
use crate::report::Report;
use crate::types::{RequestContext, StageKind, SubmissionInput, UserRole};

// ============================================================================
// Shared State
// ============================================================================

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<AnalysisPipeline>,
}

impl AppState {
    pub fn new(pipeline: AnalysisPipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
        }
    }
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub role: UserRole,
    #[serde(default)]
    pub submission: SubmissionInput,
    /// Previous index score, used if the scorer is unavailable
    #[serde(default)]
    pub last_known_index: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub station: String,
    pub collaborators: Vec<CollaboratorInfo>,
}

#[derive(Debug, Serialize)]
pub struct CollaboratorInfo {
    pub stage: StageKind,
    pub role: &'static str,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RoleInfo {
    pub role: UserRole,
    pub key: &'static str,
    pub confidence_threshold: f64,
    pub permitted_stages: Vec<StageKind>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/health
pub async fn get_health(State(state): State<AppState>) -> Response {
    let stages = state.pipeline.stages();
    let collaborators = StageKind::ALL
        .into_iter()
        .zip(stages.names())
        .map(|(stage, name)| CollaboratorInfo {
            stage,
            role: stage.collaborator(),
            name: name.to_string(),
        })
        .collect();

    ApiResponse::ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        station: state.pipeline.config().station.name.clone(),
        collaborators,
    })
}

/// GET /api/v1/roles
pub async fn get_roles(State(state): State<AppState>) -> Response {
    let config = state.pipeline.config();
    let roles: Vec<RoleInfo> = UserRole::ALL
        .into_iter()
        .map(|role| {
            let profile = config.role_profile(role);
            RoleInfo {
                role,
                key: role.key(),
                confidence_threshold: profile.confidence_threshold,
                permitted_stages: profile.permitted_stages.to_vec(),
            }
        })
        .collect();
    ApiResponse::ok(roles)
}

/// POST /api/v1/analyze
///
/// Runs the pipeline and answers with the requesting role's view. The
/// envelope meta lists the synthetic stages of the run.
pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    match run_analysis(&state, body).await {
        Ok((report, role)) => ApiResponse::new(report.view_for(role))
            .with_pipeline(&report)
            .into_response(),
        Err(resp) => resp,
    }
}

/// POST /api/v1/analyze/csv
///
/// Runs the pipeline and answers with the `Metric,Value` summary. The
/// summary spans every stage, so only roles that may view all of them get it.
pub async fn analyze_csv(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Response {
    let format = ExportFormat::Summary;
    if let Ok(Json(req)) = &body {
        if !format.permitted_for(req.role) {
            return ApiErrorResponse::forbidden(format!(
                "role {} may not export the {format} layout",
                req.role
            ));
        }
    }

    let (report, _) = match run_analysis(&state, body).await {
        Ok(done) => done,
        Err(resp) => return resp,
    };

    let csv = match format.render(&report) {
        Ok(csv) => csv,
        Err(e) => return ApiErrorResponse::internal(e.to_string()),
    };
    let disposition = format!(
        "attachment; filename=\"{}\"",
        format.default_file_name(report.generated_at())
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    )
        .into_response()
}

/// Validate the request and run the pipeline off the async workers.
async fn run_analysis(
    state: &AppState,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<(Report, UserRole), Response> {
    let Json(req) = body.map_err(|rejection| ApiErrorResponse::bad_request(rejection.body_text()))?;

    if req.submission.image_path.is_some() || req.submission.spectrum_path.is_some() {
        return Err(ApiErrorResponse::bad_request(
            "image_path and spectrum_path are not accepted over HTTP, send inline data",
        ));
    }

    let role = req.role;
    let config = state.pipeline.config();
    let ctx = RequestContext::for_role(role, config).with_last_known_index(req.last_known_index);
    let submission = req
        .submission
        .into_submission(ctx.confidence_threshold)
        .map_err(|e| {
            warn!(role = %role, error = %e, "Rejected submission");
            ApiErrorResponse::bad_request(e.to_string())
        })?;

    let pipeline = Arc::clone(&state.pipeline);
    let report = tokio::task::spawn_blocking(move || pipeline.run(submission, &ctx))
        .await
        .map_err(|e| ApiErrorResponse::internal(format!("analysis task failed: {e}")))?;

    info!(report_id = %report.id(), role = %role, "Served analysis");
    Ok((report, role))
}
