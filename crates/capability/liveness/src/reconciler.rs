//! 对账器
//!
//! 把判定结果落到快照集合上；发生真实翻转时写回持久化存储，提交成功后发出通知。
//! 冲突以持久化存储为准：
//! - 记录缺失（上游已删除）：丢弃本地快照，不写回、不通知
//! - 记录失效（并发拆除）：本轮跳过写回与通知，快照标记为待同步
//! - 写回失败：快照照常更新并标记为待同步，下一轮周期检测重试
//!
//! 每次 `apply_push` / `apply_pull` 都需要 `&mut self`，调用方保证串行。

use crate::error::LivenessError;
use crate::evaluator::{PullDecision, PushDecision, evaluate_pull, evaluate_push};
use crate::notify::NotificationSink;
use crate::snapshot::{DeviceSnapshot, SnapshotSet};
use domain::{ConnectionStatus, StatusReport, TenantContext};
use ems_storage::{DeviceStatusStore, DeviceStatusUpdate, StorageErrorKind};
use ems_telemetry::{
    record_devices_merged, record_durable_write_failure, record_durable_write_skipped,
    record_durable_write_success, record_notification_emitted, record_snapshot_reload,
    record_stale_snapshot_dropped, record_transition_offline, record_transition_online,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 一次写回尝试的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteBack {
    /// 已提交并发出通知。
    Committed,
    /// 持久化存储中已是目标状态，无需写回。
    AlreadyRecorded,
    /// 记录已失效，本轮跳过。
    Skipped,
    /// 写回失败，等待重试。
    Failed,
    /// 记录不存在，本地快照已丢弃。
    Missing,
    /// 持久化存储已有更新的访问记录，放弃写回并采用存储中的状态。
    Superseded {
        last_access_ms: i64,
        connection_status: ConnectionStatus,
    },
}

impl WriteBack {
    fn settled(self) -> bool {
        matches!(
            self,
            WriteBack::Committed | WriteBack::AlreadyRecorded | WriteBack::Superseded { .. }
        )
    }
}

/// 推送路径结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// 设备不在集合中（或集合为空），已从持久化存储整体重载，本轮不判定。
    Reloaded { devices: usize },
    /// 需要重载但读取持久化存储失败。
    ReloadFailed,
    /// 报文过期或不比现有数据新。
    Ignored,
    /// 在线设备收到更新的报文，只更新了内存。
    Refreshed,
    /// 离线 → 在线。
    BecameOnline(WriteBack),
    /// 持久化记录已不存在，本地快照被丢弃。
    Dropped,
}

/// 一轮周期检测的汇总。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullSummary {
    pub evaluated: usize,
    pub went_offline: usize,
    pub written: usize,
    pub already_recorded: usize,
    pub retried: usize,
    pub superseded: usize,
    pub deferred: usize,
    pub dropped: usize,
    pub merged: usize,
}

pub struct Reconciler {
    store: Arc<dyn DeviceStatusStore>,
    notifier: Arc<dyn NotificationSink>,
    ctx: TenantContext,
    project_id: String,
    connection_timeout: Duration,
    snapshots: SnapshotSet,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn DeviceStatusStore>,
        notifier: Arc<dyn NotificationSink>,
        tenant_id: impl Into<String>,
        project_id: impl Into<String>,
        connection_timeout: Duration,
    ) -> Self {
        let project_id = project_id.into();
        Self {
            store,
            notifier,
            ctx: TenantContext::system(tenant_id, project_id.clone()),
            project_id,
            connection_timeout,
            snapshots: SnapshotSet::new(),
        }
    }

    pub fn snapshots(&self) -> &SnapshotSet {
        &self.snapshots
    }

    pub fn snapshot_list(&self) -> Vec<DeviceSnapshot> {
        self.snapshots.to_sorted_vec()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    /// 从持久化存储重载快照集合，保留内存中更新或待写回的条目。
    /// 读取失败时保留原集合。
    pub async fn reload(&mut self) -> Result<usize, LivenessError> {
        let records = self.store.list_devices(&self.ctx, &self.project_id).await?;
        self.snapshots.sync_from_records(&records);
        record_snapshot_reload();
        info!(
            target: "ems.liveness",
            tenant_id = %self.ctx.tenant_id,
            project_id = %self.project_id,
            devices = records.len(),
            "snapshot_reloaded"
        );
        Ok(records.len())
    }

    pub async fn apply_push(&mut self, report: &StatusReport, now_ms: i64) -> PushOutcome {
        let Some(snapshot) = self.snapshots.get(&report.device_id).cloned() else {
            debug!(
                target: "ems.liveness",
                device_id = %report.device_id,
                known_devices = self.snapshots.len(),
                "snapshot_miss_reload"
            );
            return match self.reload().await {
                Ok(devices) => PushOutcome::Reloaded { devices },
                Err(err) => {
                    warn!(target: "ems.liveness", error = %err, "snapshot_reload_failed");
                    PushOutcome::ReloadFailed
                }
            };
        };

        match evaluate_push(&snapshot, report, now_ms, self.connection_timeout) {
            PushDecision::NoOp => PushOutcome::Ignored,
            PushDecision::Refreshed { last_access_ms } => {
                if let Some(entry) = self.snapshots.get_mut(&report.device_id) {
                    entry.last_access_ms = last_access_ms;
                }
                PushOutcome::Refreshed
            }
            PushDecision::BecameOnline { last_access_ms } => {
                record_transition_online();
                info!(
                    target: "ems.liveness",
                    device_id = %report.device_id,
                    last_access_ms = last_access_ms,
                    "device_online"
                );
                let update = DeviceStatusUpdate {
                    last_access_ms,
                    connection_status: ConnectionStatus::Online,
                };
                let result = self.write_back(&report.device_id, update, false).await;
                if result == WriteBack::Missing {
                    self.drop_stale(&report.device_id);
                    return PushOutcome::Dropped;
                }
                if let Some(entry) = self.snapshots.get_mut(&report.device_id) {
                    entry.last_access_ms = last_access_ms;
                    entry.connection_status = ConnectionStatus::Online;
                    entry.pending_sync = !result.settled();
                }
                PushOutcome::BecameOnline(result)
            }
        }
    }

    pub async fn apply_pull(&mut self, now_ms: i64) -> PullSummary {
        let mut summary = PullSummary::default();

        for device_id in self.snapshots.ids() {
            let Some(snapshot) = self.snapshots.get(&device_id).cloned() else {
                continue;
            };
            summary.evaluated += 1;

            let (result, status) = match evaluate_pull(&snapshot, now_ms, self.connection_timeout) {
                PullDecision::WentOffline => {
                    summary.went_offline += 1;
                    record_transition_offline();
                    info!(
                        target: "ems.liveness",
                        device_id = %device_id,
                        last_access_ms = snapshot.last_access_ms,
                        age_ms = now_ms.saturating_sub(snapshot.last_access_ms),
                        "device_offline"
                    );
                    let update = DeviceStatusUpdate {
                        last_access_ms: snapshot.last_access_ms,
                        connection_status: ConnectionStatus::Offline,
                    };
                    let result = self.write_back(&device_id, update, true).await;
                    (result, ConnectionStatus::Offline)
                }
                PullDecision::NoOp if snapshot.pending_sync => {
                    summary.retried += 1;
                    let update = DeviceStatusUpdate {
                        last_access_ms: snapshot.last_access_ms,
                        connection_status: snapshot.connection_status,
                    };
                    let result = self.write_back(&device_id, update, true).await;
                    (result, snapshot.connection_status)
                }
                PullDecision::NoOp => continue,
            };

            match result {
                WriteBack::Missing => {
                    self.drop_stale(&device_id);
                    summary.dropped += 1;
                    continue;
                }
                WriteBack::Superseded {
                    last_access_ms,
                    connection_status,
                } => {
                    summary.superseded += 1;
                    if let Some(entry) = self.snapshots.get_mut(&device_id) {
                        entry.last_access_ms = last_access_ms;
                        entry.connection_status = connection_status;
                        entry.pending_sync = false;
                    }
                    continue;
                }
                WriteBack::Committed => summary.written += 1,
                WriteBack::AlreadyRecorded => summary.already_recorded += 1,
                WriteBack::Skipped | WriteBack::Failed => summary.deferred += 1,
            }
            if let Some(entry) = self.snapshots.get_mut(&device_id) {
                entry.connection_status = status;
                entry.pending_sync = !result.settled();
            }
        }

        summary.merged = self.merge_new_devices().await;
        summary
    }

    /// 合并持久化存储中新出现的设备，返回新增数量。
    pub async fn merge_new_devices(&mut self) -> usize {
        let records = match self.store.list_devices(&self.ctx, &self.project_id).await {
            Ok(records) => records,
            Err(err) => {
                warn!(target: "ems.liveness", error = %err, "device_merge_failed");
                return 0;
            }
        };
        let merged = self.snapshots.merge_new(&records);
        if merged > 0 {
            record_devices_merged(merged as u64);
            info!(target: "ems.liveness", merged = merged, "devices_merged");
        }
        merged
    }

    /// 读取权威记录并写回。
    ///
    /// `from_pull` 为 true 时以持久化存储为准：存储中的访问时间更新则放弃写回，
    /// 已是目标状态则不写回、不通知。
    async fn write_back(
        &self,
        device_id: &str,
        update: DeviceStatusUpdate,
        from_pull: bool,
    ) -> WriteBack {
        let record = match self
            .store
            .find_device(&self.ctx, &self.project_id, device_id)
            .await
        {
            Ok(Some(record)) => record,
            Ok(None) => return WriteBack::Missing,
            Err(err) => {
                record_durable_write_failure();
                warn!(
                    target: "ems.liveness",
                    device_id = %device_id,
                    error = %err,
                    "durable_read_failed"
                );
                return WriteBack::Failed;
            }
        };
        if record.invalidated {
            record_durable_write_skipped();
            info!(target: "ems.liveness", device_id = %device_id, "durable_write_skipped_invalidated");
            return WriteBack::Skipped;
        }
        if from_pull && record.last_access_ms > update.last_access_ms {
            debug!(
                target: "ems.liveness",
                device_id = %device_id,
                durable_last_access_ms = record.last_access_ms,
                local_last_access_ms = update.last_access_ms,
                "durable_record_newer"
            );
            return WriteBack::Superseded {
                last_access_ms: record.last_access_ms,
                connection_status: record.connection_status,
            };
        }
        if from_pull && record.connection_status == update.connection_status {
            debug!(
                target: "ems.liveness",
                device_id = %device_id,
                status = %update.connection_status,
                "durable_status_already_recorded"
            );
            return WriteBack::AlreadyRecorded;
        }

        match self
            .store
            .write_status(&self.ctx, &self.project_id, device_id, update)
            .await
        {
            Ok(()) => {
                record_durable_write_success();
                self.notifier.notify_connectivity_changed();
                record_notification_emitted();
                info!(
                    target: "ems.liveness",
                    device_id = %device_id,
                    status = %update.connection_status,
                    last_access_ms = update.last_access_ms,
                    "durable_write_committed"
                );
                WriteBack::Committed
            }
            Err(err) => match err.kind() {
                StorageErrorKind::NotFound => WriteBack::Missing,
                StorageErrorKind::Invalidated => {
                    record_durable_write_skipped();
                    info!(target: "ems.liveness", device_id = %device_id, "durable_write_skipped_invalidated");
                    WriteBack::Skipped
                }
                _ => {
                    record_durable_write_failure();
                    warn!(
                        target: "ems.liveness",
                        device_id = %device_id,
                        error = %err,
                        "durable_write_failed"
                    );
                    WriteBack::Failed
                }
            },
        }
    }

    fn drop_stale(&mut self, device_id: &str) {
        if self.snapshots.remove(device_id).is_some() {
            record_stale_snapshot_dropped();
            info!(target: "ems.liveness", device_id = %device_id, "stale_snapshot_dropped");
        }
    }
}
