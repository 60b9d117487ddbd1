//! 设备状态内存存储实现
//!
//! 用于测试与无数据库的演示模式。
//!
//! 功能：
//! - 设备枚举与读取（项目级过滤）
//! - 状态写回（单次写锁内同时更新两个字段）
//! - 测试辅助：插入、删除、标记失效

use crate::error::StorageError;
use crate::models::{DeviceStatusRecord, DeviceStatusUpdate};
use crate::traits::DeviceStatusStore;
use crate::validation::ensure_project_scope;
use domain::TenantContext;
use std::collections::HashMap;
use std::sync::RwLock;

/// 设备状态内存存储
///
/// 使用 RwLock + HashMap 提供线程安全的内存存储。
pub struct InMemoryDeviceStatusStore {
    devices: RwLock<HashMap<String, DeviceStatusRecord>>,
}

impl InMemoryDeviceStatusStore {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
        }
    }

    /// 使用给定记录初始化
    pub fn with_devices(records: impl IntoIterator<Item = DeviceStatusRecord>) -> Self {
        let devices = records
            .into_iter()
            .map(|record| (record.device_id.clone(), record))
            .collect();
        Self {
            devices: RwLock::new(devices),
        }
    }

    /// 插入或覆盖一条记录（模拟上游新增设备）
    pub fn insert_device(&self, record: DeviceStatusRecord) -> Result<(), StorageError> {
        let mut map = self
            .devices
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        map.insert(record.device_id.clone(), record);
        Ok(())
    }

    /// 删除记录（模拟上游删除设备）
    pub fn remove_device(&self, device_id: &str) -> Result<bool, StorageError> {
        let mut map = self
            .devices
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(map.remove(device_id).is_some())
    }

    /// 标记记录失效（模拟并发拆除）
    pub fn invalidate_device(&self, device_id: &str, invalidated: bool) -> Result<bool, StorageError> {
        let mut map = self
            .devices
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        match map.get_mut(device_id) {
            Some(record) => {
                record.invalidated = invalidated;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 直接读取记录（不做作用域校验，测试断言用）
    pub fn get(&self, device_id: &str) -> Option<DeviceStatusRecord> {
        self.devices
            .read()
            .ok()
            .and_then(|map| map.get(device_id).cloned())
    }
}

impl Default for InMemoryDeviceStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DeviceStatusStore for InMemoryDeviceStatusStore {
    async fn list_devices(
        &self,
        ctx: &TenantContext,
        project_id: &str,
    ) -> Result<Vec<DeviceStatusRecord>, StorageError> {
        ensure_project_scope(ctx, project_id)?;
        let map = self
            .devices
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut items: Vec<DeviceStatusRecord> = map
            .values()
            .filter(|item| item.tenant_id == ctx.tenant_id && item.project_id == project_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(items)
    }

    async fn find_device(
        &self,
        ctx: &TenantContext,
        project_id: &str,
        device_id: &str,
    ) -> Result<Option<DeviceStatusRecord>, StorageError> {
        ensure_project_scope(ctx, project_id)?;
        let item = self
            .devices
            .read()
            .map_err(|_| StorageError::new("lock failed"))?
            .get(device_id)
            .cloned()
            .filter(|item| item.tenant_id == ctx.tenant_id && item.project_id == project_id);
        Ok(item)
    }

    async fn write_status(
        &self,
        ctx: &TenantContext,
        project_id: &str,
        device_id: &str,
        update: DeviceStatusUpdate,
    ) -> Result<(), StorageError> {
        ensure_project_scope(ctx, project_id)?;
        let mut map = self
            .devices
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let record = match map.get_mut(device_id) {
            Some(record) if record.tenant_id == ctx.tenant_id && record.project_id == project_id => {
                record
            }
            _ => return Err(StorageError::not_found(device_id)),
        };
        if record.invalidated {
            return Err(StorageError::invalidated(device_id));
        }
        record.last_access_ms = update.last_access_ms;
        record.connection_status = update.connection_status;
        Ok(())
    }
}
