//! REST API module using Axum
//!
//! Exposes the analysis pipeline over HTTP for dashboards:
//! - `/api/v1/*` endpoints wrapped in the `{data, meta}` envelope
//! - request tracing via `TraceLayer`
//! - same-origin CORS unless `AQUASCOPE_CORS_ORIGINS` lists callers

pub mod envelope;
pub mod handlers;
mod routes;

pub use handlers::AppState;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Environment variable listing allowed cross-origin callers.
pub const CORS_ENV_VAR: &str = "AQUASCOPE_CORS_ORIGINS";

/// Parse a comma-separated origin list, dropping blanks and entries that are
/// not valid header values.
fn parse_origins(list: &str) -> Vec<HeaderValue> {
    list.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

fn build_cors_layer() -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let Ok(list) = std::env::var(CORS_ENV_VAR) else {
        return layer;
    };
    let origins = parse_origins(&list);
    tracing::info!(count = origins.len(), "CORS: allowing configured origins");
    layer.allow_origin(origins)
}

/// Create the complete application router.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_origins_skips_blanks() {
        let origins = parse_origins(" http://localhost:5173 ,, https://ops.example.org");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0], "http://localhost:5173");
    }

    #[test]
    fn test_parse_origins_drops_invalid() {
        assert!(parse_origins("bad\norigin").is_empty());
    }
}
