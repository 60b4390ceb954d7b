//! API route definitions
//!
//! - /api/v1/health - Liveness and installed collaborators
//! - /api/v1/roles - Role lookup table with effective thresholds
//! - /api/v1/analyze - Run the pipeline, answer the role's report view
//! - /api/v1/analyze/csv - Run the pipeline, answer the summary CSV

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, AppState};

/// Create all v1 API routes
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/roles", get(handlers::get_roles))
        .route("/analyze", post(handlers::analyze))
        .route("/analyze/csv", post(handlers::analyze_csv))
        .with_state(state)
}
