use axum::{extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::{AppState, extract::Json};

/// Liveness plus a round trip to the database.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let uptime_seconds = state.started_at.elapsed().as_secs();

    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "uptime_seconds": uptime_seconds })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "uptime_seconds": uptime_seconds })),
            )
        }
    }
}
