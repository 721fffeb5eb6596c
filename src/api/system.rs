use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::types::HealthResponse;
use super::{ApiResponse, AppState};

/// `GET /api/health`
///
/// Reports process version and uptime plus database reachability. Serves
/// 503 when the database does not answer, so load balancers can pull the
/// instance without parsing the body.
pub async fn health(State(state): State<Arc<AppState>>) -> Response {
    let db_ready = state.store().ping().await.is_ok();

    let status = if db_ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ApiResponse::success(HealthResponse {
            status: if db_ready { "ok" } else { "degraded" }.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.start_time.elapsed().as_secs(),
            database: if db_ready { "reachable" } else { "unreachable" }.to_string(),
        })),
    )
        .into_response()
}
