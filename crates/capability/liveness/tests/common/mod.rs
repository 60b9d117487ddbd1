#![allow(dead_code)]

use async_trait::async_trait;
use domain::{ConnectionStatus, TenantContext};
use ems_liveness::NotificationSink;
use ems_storage::{
    DeviceStatusRecord, DeviceStatusStore, DeviceStatusUpdate, InMemoryDeviceStatusStore,
    StorageError,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub const TENANT: &str = "tenant-1";
pub const PROJECT: &str = "project-1";

pub fn record(device_id: &str, last_access_ms: i64, status: ConnectionStatus) -> DeviceStatusRecord {
    DeviceStatusRecord {
        tenant_id: TENANT.to_string(),
        project_id: PROJECT.to_string(),
        device_id: device_id.to_string(),
        last_access_ms,
        connection_status: status,
        invalidated: false,
    }
}

/// 记录写回次数的存储包装，可注入读写失败。
#[derive(Default)]
pub struct CountingStore {
    pub inner: InMemoryDeviceStatusStore,
    writes: AtomicUsize,
    lists: AtomicUsize,
    fail_writes: AtomicBool,
    fail_lists: AtomicBool,
    fail_reads: AtomicBool,
}

impl CountingStore {
    pub fn with_devices(records: impl IntoIterator<Item = DeviceStatusRecord>) -> Arc<Self> {
        Arc::new(Self {
            inner: InMemoryDeviceStatusStore::with_devices(records),
            ..Self::default()
        })
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn status_of(&self, device_id: &str) -> Option<ConnectionStatus> {
        self.inner.get(device_id).map(|record| record.connection_status)
    }
}

#[async_trait]
impl DeviceStatusStore for CountingStore {
    async fn list_devices(
        &self,
        ctx: &TenantContext,
        project_id: &str,
    ) -> Result<Vec<DeviceStatusRecord>, StorageError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(StorageError::new("list unavailable"));
        }
        self.inner.list_devices(ctx, project_id).await
    }

    async fn find_device(
        &self,
        ctx: &TenantContext,
        project_id: &str,
        device_id: &str,
    ) -> Result<Option<DeviceStatusRecord>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::new("read unavailable"));
        }
        self.inner.find_device(ctx, project_id, device_id).await
    }

    async fn write_status(
        &self,
        ctx: &TenantContext,
        project_id: &str,
        device_id: &str,
        update: DeviceStatusUpdate,
    ) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::new("write unavailable"));
        }
        self.inner
            .write_status(ctx, project_id, device_id, update)
            .await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingNotifier {
    count: AtomicUsize,
}

impl CountingNotifier {
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl NotificationSink for CountingNotifier {
    fn notify_connectivity_changed(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}
