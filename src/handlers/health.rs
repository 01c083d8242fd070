use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::AppState;

/// Healthy when the device session can be confirmed or renewed.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let mut device = state.device.lock().await;
    match device.ensure_valid().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::warn!(error = %e, "Health check: device unreachable or rejecting login");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "degraded" })),
            )
        }
    }
}
