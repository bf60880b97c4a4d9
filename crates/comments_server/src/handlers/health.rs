//! GET /health: liveness probe (public).

use axum::Json;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "message": "System is running",
    }))
}
