//! Response envelope for the analysis API.
//!
//! Success bodies are `{ "data": ..., "meta": ... }` and failures are
//! `{ "error": ..., "meta": ... }`. When a response was produced from a
//! pipeline run, `meta.pipeline` names the report and its synthetic stages,
//! so a client can tell a fallback-filled answer apart without walking the
//! view. The stage list is the same for every role: hidden values stay
//! hidden, but their tags never do.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::report::Report;
use crate::types::StageKind;

/// Envelope schema version, bumped on breaking shape changes.
pub const API_VERSION: &str = "1";

/// Stage health of the run a response was built from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineMeta {
    pub report_id: Uuid,
    pub fully_measured: bool,
    /// Stages whose values are fallbacks, in stage order
    pub degraded: Vec<StageKind>,
}

impl PipelineMeta {
    pub fn of(report: &Report) -> Self {
        let degraded = report.degraded_stages();
        Self {
            report_id: report.id(),
            fully_measured: degraded.is_empty(),
            degraded,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub timestamp: DateTime<Utc>,
    pub api_version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<PipelineMeta>,
}

impl ResponseMeta {
    fn now() -> Self {
        Self {
            timestamp: Utc::now(),
            api_version: API_VERSION,
            pipeline: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::now(),
        }
    }

    /// Attach the stage health of `report` to the meta block.
    pub fn with_pipeline(mut self, report: &Report) -> Self {
        self.meta.pipeline = Some(PipelineMeta::of(report));
        self
    }

    pub fn ok(data: T) -> Response {
        Self::new(data).into_response()
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, axum::Json(self)).into_response()
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed JSON, out-of-range measurements or file references
    BadRequest,
    /// The role may not see every stage the response would reveal
    Forbidden,
    InternalError,
}

impl ErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
    pub meta: ResponseMeta,
}

impl ApiErrorResponse {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code,
                message: message.into(),
            },
            meta: ResponseMeta::now(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Response {
        Self::new(ErrorCode::BadRequest, message).into_response()
    }

    pub fn forbidden(message: impl Into<String>) -> Response {
        Self::new(ErrorCode::Forbidden, message).into_response()
    }

    pub fn internal(message: impl Into<String>) -> Response {
        Self::new(ErrorCode::InternalError, message).into_response()
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.error.code.status(), axum::Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;
    use crate::pipeline::AnalysisPipeline;
    use crate::stages::StageSet;
    use crate::types::{RequestContext, SampleSubmission, UserRole, WaterMeasurements};

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_plain_response_has_no_pipeline_meta() {
        let resp = ApiResponse::ok(serde_json::json!({"particles": 12}));
        assert_eq!(resp.status(), StatusCode::OK);

        let v = body_json(resp).await;
        assert_eq!(v["data"]["particles"], 12);
        assert_eq!(v["meta"]["api_version"], API_VERSION);
        assert!(v["meta"].get("pipeline").is_none());
    }

    #[tokio::test]
    async fn test_report_response_lists_degraded_stages() {
        let mut config = MonitorConfig::default();
        config.fallback.seed = Some(5);
        let ctx = RequestContext::for_role(UserRole::Public, &config);
        let pipeline = AnalysisPipeline::new(StageSet::default(), config).unwrap();
        let submission = SampleSubmission::new(WaterMeasurements::default(), 0.5).unwrap();
        let report = pipeline.run(submission, &ctx);

        let resp = ApiResponse::new(report.view_for(UserRole::Public))
            .with_pipeline(&report)
            .into_response();
        let v = body_json(resp).await;

        let meta = &v["meta"]["pipeline"];
        assert_eq!(meta["report_id"], report.id().to_string());
        assert_eq!(meta["fully_measured"], false);
        assert_eq!(meta["degraded"].as_array().map(Vec::len), Some(6));
        assert_eq!(meta["degraded"][0], "detect");
    }

    #[tokio::test]
    async fn test_error_code_sets_status() {
        let resp = ApiErrorResponse::forbidden("role public may not export the summary layout");
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let v = body_json(resp).await;
        assert_eq!(v["error"]["code"], "FORBIDDEN");
        assert!(v["meta"]["timestamp"].is_string());
        assert_eq!(ErrorCode::InternalError.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            serde_json::to_value(ErrorCode::InternalError).unwrap(),
            "INTERNAL_ERROR"
        );
    }
}
