//! 设备快照集合
//!
//! 与持久化存储相互独立的内存工作集，只保存检测所需的字段。
//! 集合只由检测 worker 持有，不做内部加锁。

use domain::ConnectionStatus;
use ems_storage::DeviceStatusRecord;
use std::collections::HashMap;

/// 单个设备的内存快照。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    pub device_id: String,
    pub last_access_ms: i64,
    pub connection_status: ConnectionStatus,
    /// 内存状态尚未成功写回持久化存储。
    pub pending_sync: bool,
}

impl DeviceSnapshot {
    pub fn new(
        device_id: impl Into<String>,
        last_access_ms: i64,
        connection_status: ConnectionStatus,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            last_access_ms,
            connection_status,
            pending_sync: false,
        }
    }

    pub fn from_record(record: &DeviceStatusRecord) -> Self {
        Self::new(
            record.device_id.clone(),
            record.last_access_ms,
            record.connection_status,
        )
    }
}

#[derive(Debug, Default)]
pub struct SnapshotSet {
    entries: HashMap<String, DeviceSnapshot>,
}

impl SnapshotSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: &[DeviceStatusRecord]) -> Self {
        let mut set = Self::new();
        set.sync_from_records(records);
        set
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.entries.contains_key(device_id)
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceSnapshot> {
        self.entries.get(device_id)
    }

    pub fn get_mut(&mut self, device_id: &str) -> Option<&mut DeviceSnapshot> {
        self.entries.get_mut(device_id)
    }

    pub fn insert(&mut self, snapshot: DeviceSnapshot) {
        self.entries.insert(snapshot.device_id.clone(), snapshot);
    }

    pub fn remove(&mut self, device_id: &str) -> Option<DeviceSnapshot> {
        self.entries.remove(device_id)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// 按持久化存储的设备列表重建集合。
    ///
    /// 存储中已不存在的设备被移除；已有条目在内存更新（最后访问时间更新，
    /// 或尚待写回）时保留内存快照，否则采用存储记录。
    pub fn sync_from_records(&mut self, records: &[DeviceStatusRecord]) {
        let mut previous = std::mem::take(&mut self.entries);
        for record in records {
            let snapshot = match previous.remove(&record.device_id) {
                Some(local)
                    if local.pending_sync || local.last_access_ms > record.last_access_ms =>
                {
                    local
                }
                _ => DeviceSnapshot::from_record(record),
            };
            self.insert(snapshot);
        }
    }

    /// 合并新发现的设备，返回新增数量。已有条目保持不变，这里从不删除。
    pub fn merge_new(&mut self, records: &[DeviceStatusRecord]) -> usize {
        let mut added = 0;
        for record in records {
            if self.entries.contains_key(&record.device_id) {
                continue;
            }
            self.insert(DeviceSnapshot::from_record(record));
            added += 1;
        }
        added
    }

    /// 按设备 ID 排序的 ID 列表。
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// 按设备 ID 排序的快照副本。
    pub fn to_sorted_vec(&self) -> Vec<DeviceSnapshot> {
        let mut items: Vec<DeviceSnapshot> = self.entries.values().cloned().collect();
        items.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        items
    }
}
