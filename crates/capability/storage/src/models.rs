//! 数据模型
//!
//! - DeviceStatusRecord：持久化侧的设备连接状态（权威来源）
//! - DeviceStatusUpdate：一次原子写回的内容

use domain::ConnectionStatus;

/// 设备连接状态记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceStatusRecord {
    pub tenant_id: String,
    pub project_id: String,
    pub device_id: String,
    pub last_access_ms: i64,
    pub connection_status: ConnectionStatus,
    /// 记录已被并发拆除（软删除），此时不允许写回。
    pub invalidated: bool,
}

/// 状态写回输入：两个字段总是一起提交。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceStatusUpdate {
    pub last_access_ms: i64,
    pub connection_status: ConnectionStatus,
}
