//! 稳定的 DTO 与 API 响应契约。

use serde::Serialize;

/// 标准 API 响应封装。
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

/// 失败响应的错误体。
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.into(),
                message: message.into(),
            }),
        }
    }
}

/// 设备连接状态返回结构。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConnectivityDto {
    pub device_id: String,
    pub last_access_ms: i64,
    /// `online` / `offline`
    pub connection_status: String,
    /// 内存状态尚未写回持久化存储。
    pub pending_sync: bool,
}

/// 检测器生命周期状态。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleStateDto {
    /// `stopped` / `running` / `suspended`
    pub state: String,
}

/// 检测器计数指标。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshotDto {
    pub reports_received: u64,
    pub transitions_online: u64,
    pub transitions_offline: u64,
    pub durable_write_success: u64,
    pub durable_write_failure: u64,
    pub durable_write_skipped: u64,
    pub notifications_emitted: u64,
    pub stale_snapshots_dropped: u64,
    pub snapshot_reloads: u64,
    pub devices_merged: u64,
    pub pull_passes: u64,
}
