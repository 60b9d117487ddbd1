use axum::{Json, response::IntoResponse};

/// 健康检查：只反映进程存活。
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}
