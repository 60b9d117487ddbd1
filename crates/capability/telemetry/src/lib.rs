//! 追踪初始化、请求 ID 与在线检测计数指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 请求级追踪标识。
#[derive(Debug, Clone)]
pub struct RequestIds {
    pub request_id: String,
    pub trace_id: String,
}

/// 指标快照。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
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

/// 在线检测计数指标。
pub struct TelemetryMetrics {
    reports_received: AtomicU64,
    transitions_online: AtomicU64,
    transitions_offline: AtomicU64,
    durable_write_success: AtomicU64,
    durable_write_failure: AtomicU64,
    durable_write_skipped: AtomicU64,
    notifications_emitted: AtomicU64,
    stale_snapshots_dropped: AtomicU64,
    snapshot_reloads: AtomicU64,
    devices_merged: AtomicU64,
    pull_passes: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            reports_received: AtomicU64::new(0),
            transitions_online: AtomicU64::new(0),
            transitions_offline: AtomicU64::new(0),
            durable_write_success: AtomicU64::new(0),
            durable_write_failure: AtomicU64::new(0),
            durable_write_skipped: AtomicU64::new(0),
            notifications_emitted: AtomicU64::new(0),
            stale_snapshots_dropped: AtomicU64::new(0),
            snapshot_reloads: AtomicU64::new(0),
            devices_merged: AtomicU64::new(0),
            pull_passes: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            reports_received: self.reports_received.load(Ordering::Relaxed),
            transitions_online: self.transitions_online.load(Ordering::Relaxed),
            transitions_offline: self.transitions_offline.load(Ordering::Relaxed),
            durable_write_success: self.durable_write_success.load(Ordering::Relaxed),
            durable_write_failure: self.durable_write_failure.load(Ordering::Relaxed),
            durable_write_skipped: self.durable_write_skipped.load(Ordering::Relaxed),
            notifications_emitted: self.notifications_emitted.load(Ordering::Relaxed),
            stale_snapshots_dropped: self.stale_snapshots_dropped.load(Ordering::Relaxed),
            snapshot_reloads: self.snapshot_reloads.load(Ordering::Relaxed),
            devices_merged: self.devices_merged.load(Ordering::Relaxed),
            pull_passes: self.pull_passes.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info，可用 RUST_LOG 覆盖）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 request_id 与 trace_id。
pub fn new_request_ids() -> RequestIds {
    RequestIds {
        request_id: uuid::Uuid::new_v4().to_string(),
        trace_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// 记录状态报文接收次数。
pub fn record_report_received() {
    metrics().reports_received.fetch_add(1, Ordering::Relaxed);
}

/// 记录 离线 → 在线 翻转次数。
pub fn record_transition_online() {
    metrics().transitions_online.fetch_add(1, Ordering::Relaxed);
}

/// 记录 在线 → 离线 翻转次数。
pub fn record_transition_offline() {
    metrics().transitions_offline.fetch_add(1, Ordering::Relaxed);
}

/// 记录写回成功次数。
pub fn record_durable_write_success() {
    metrics()
        .durable_write_success
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录写回失败次数。
pub fn record_durable_write_failure() {
    metrics()
        .durable_write_failure
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录因记录失效而跳过写回的次数。
pub fn record_durable_write_skipped() {
    metrics()
        .durable_write_skipped
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录通知发出次数。
pub fn record_notification_emitted() {
    metrics()
        .notifications_emitted
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录过期本地快照清理次数。
pub fn record_stale_snapshot_dropped() {
    metrics()
        .stale_snapshots_dropped
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录快照集合全量重载次数。
pub fn record_snapshot_reload() {
    metrics().snapshot_reloads.fetch_add(1, Ordering::Relaxed);
}

/// 记录新发现设备合并数量。
pub fn record_devices_merged(count: u64) {
    metrics().devices_merged.fetch_add(count, Ordering::Relaxed);
}

/// 记录周期检测轮次。
pub fn record_pull_pass() {
    metrics().pull_passes.fetch_add(1, Ordering::Relaxed);
}
