use axum::{Json, response::IntoResponse};

pub async fn index_handler() -> &'static str {
    "success"
}

pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}
