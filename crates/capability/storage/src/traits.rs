//! 存储接口 Trait 定义
//!
//! 在线检测核心只消费这一个接口：设备枚举、单设备读取、状态原子写回。
//!
//! 设计原则：
//! - 所有接口显式接收 TenantContext
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发

use crate::error::StorageError;
use crate::models::{DeviceStatusRecord, DeviceStatusUpdate};
use async_trait::async_trait;
use domain::TenantContext;

/// 设备状态持久化网关
#[async_trait]
pub trait DeviceStatusStore: Send + Sync {
    /// 列出项目内所有已知设备
    async fn list_devices(
        &self,
        ctx: &TenantContext,
        project_id: &str,
    ) -> Result<Vec<DeviceStatusRecord>, StorageError>;

    /// 读取单个设备的权威记录，不存在时返回 None
    async fn find_device(
        &self,
        ctx: &TenantContext,
        project_id: &str,
        device_id: &str,
    ) -> Result<Option<DeviceStatusRecord>, StorageError>;

    /// 在一个事务内同时写入 last_access_ms 与 connection_status
    ///
    /// 记录缺失或已失效时返回错误，两个字段都不会被修改。
    async fn write_status(
        &self,
        ctx: &TenantContext,
        project_id: &str,
        device_id: &str,
        update: DeviceStatusUpdate,
    ) -> Result<(), StorageError>;
}
