//! HTTP 响应辅助函数和 DTO 转换
//!
//! - 错误响应：liveness_unavailable
//! - DTO 转换：snapshot_to_dto, lifecycle_to_dto, metrics_to_dto

use api_contract::{ApiResponse, DeviceConnectivityDto, LifecycleStateDto, MetricsSnapshotDto};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ems_liveness::{DeviceSnapshot, LifecycleState, LivenessError};
use ems_telemetry::MetricsSnapshot;
use tracing::warn;

/// 在线检测 worker 不可用（已退出）
pub fn liveness_unavailable(err: LivenessError) -> Response {
    warn!(error = %err, "liveness_unavailable");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiResponse::<()>::error(
            "LIVENESS.UNAVAILABLE",
            err.to_string(),
        )),
    )
        .into_response()
}

/// DeviceSnapshot 转 DeviceConnectivityDto
pub fn snapshot_to_dto(snapshot: DeviceSnapshot) -> DeviceConnectivityDto {
    DeviceConnectivityDto {
        device_id: snapshot.device_id,
        last_access_ms: snapshot.last_access_ms,
        connection_status: snapshot.connection_status.as_str().to_string(),
        pending_sync: snapshot.pending_sync,
    }
}

pub fn lifecycle_to_dto(state: LifecycleState) -> LifecycleStateDto {
    LifecycleStateDto {
        state: state.as_str().to_string(),
    }
}

pub fn metrics_to_dto(snapshot: MetricsSnapshot) -> MetricsSnapshotDto {
    MetricsSnapshotDto {
        reports_received: snapshot.reports_received,
        transitions_online: snapshot.transitions_online,
        transitions_offline: snapshot.transitions_offline,
        durable_write_success: snapshot.durable_write_success,
        durable_write_failure: snapshot.durable_write_failure,
        durable_write_skipped: snapshot.durable_write_skipped,
        notifications_emitted: snapshot.notifications_emitted,
        stale_snapshots_dropped: snapshot.stale_snapshots_dropped,
        snapshot_reloads: snapshot.snapshot_reloads,
        devices_merged: snapshot.devices_merged,
        pull_passes: snapshot.pull_passes,
    }
}
