//! 宿主生命周期信号
//!
//! - GET /api/lifecycle - 当前检测器状态
//! - POST /api/lifecycle/active - 宿主回到前台（恢复周期检测）
//! - POST /api/lifecycle/inactive - 宿主即将退到后台（暂停周期检测）
//!
//! 重复投递同一信号是空操作；检测器尚未启动时信号被忽略。

use crate::AppState;
use crate::utils::response::{lifecycle_to_dto, liveness_unavailable};
use api_contract::ApiResponse;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use domain::HostSignal;
use tracing::info;

pub async fn get_lifecycle(State(state): State<AppState>) -> Response {
    lifecycle_response(&state).await
}

pub async fn became_active(State(state): State<AppState>) -> Response {
    deliver(&state, HostSignal::BecameActive).await
}

pub async fn will_resign_active(State(state): State<AppState>) -> Response {
    deliver(&state, HostSignal::WillResignActive).await
}

async fn deliver(state: &AppState, signal: HostSignal) -> Response {
    info!(signal = ?signal, "host_signal_received");
    if let Err(err) = state.liveness.host_signal(signal).await {
        return liveness_unavailable(err);
    }
    lifecycle_response(state).await
}

async fn lifecycle_response(state: &AppState) -> Response {
    match state.liveness.state().await {
        Ok(current) => (
            StatusCode::OK,
            Json(ApiResponse::success(lifecycle_to_dto(current))),
        )
            .into_response(),
        Err(err) => liveness_unavailable(err),
    }
}
