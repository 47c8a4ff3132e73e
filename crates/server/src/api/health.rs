use axum::{extract::State, http::StatusCode, Json};
use tracing::warn;

use super::AppState;
use crate::generation::GenerationHealth;

/// 200 when the round trip succeeded, 500 when the API key is missing or
/// malformed, 502 when the upstream rejected the request.
pub(super) async fn check_generation(
    State(state): State<AppState>,
) -> (StatusCode, Json<GenerationHealth>) {
    let health = state.generation.check_health().await;

    let status = if health.is_healthy() {
        StatusCode::OK
    } else if !health.api_key_configured || !health.api_key_format_valid {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_GATEWAY
    };

    if status != StatusCode::OK {
        warn!(
            status = status.as_u16(),
            upstream_status = ?health.upstream_status,
            error = health.error.as_deref().unwrap_or("unknown"),
            "generation health check failed"
        );
    }

    (status, Json(health))
}
