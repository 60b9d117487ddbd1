//! 设备连接状态查询
//!
//! - GET /api/devices - 当前快照（按设备 ID 排序）
//!
//! 快照查询与检测轮次走同一个队列，返回的是某一轮结束后的完整视图。

use crate::AppState;
use crate::utils::response::{liveness_unavailable, snapshot_to_dto};
use api_contract::{ApiResponse, DeviceConnectivityDto};
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub async fn list_devices(State(state): State<AppState>) -> Response {
    match state.liveness.snapshot().await {
        Ok(snapshots) => {
            let items: Vec<DeviceConnectivityDto> =
                snapshots.into_iter().map(snapshot_to_dto).collect();
            (StatusCode::OK, Json(ApiResponse::success(items))).into_response()
        }
        Err(err) => liveness_unavailable(err),
    }
}
