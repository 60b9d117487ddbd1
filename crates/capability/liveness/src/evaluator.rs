//! 在线判定逻辑（纯函数，无副作用）
//!
//! - classify：按最后访问时间与超时判定在线/离线
//! - evaluate_push：状态报文到达时判定是否发生 离线 → 在线
//! - evaluate_pull：周期检测时判定是否发生 在线 → 离线
//!
//! "更新的报文"按观测时长比较：在同一个 now 下，报文距今的时长
//! 严格小于快照距今的时长才算更新。

use crate::snapshot::DeviceSnapshot;
use domain::{ConnectionStatus, StatusReport};
use std::time::Duration;

/// 推送路径判定结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushDecision {
    /// 离线 → 在线：需要写回并通知。
    BecameOnline { last_access_ms: i64 },
    /// 在线 → 在线且报文更新：只更新内存中的最后访问时间。
    Refreshed { last_access_ms: i64 },
    NoOp,
}

/// 拉取路径判定结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullDecision {
    /// 在线 → 离线：需要写回并通知。
    WentOffline,
    NoOp,
}

/// 距 `at_ms` 已过去的毫秒数。
pub fn age_ms(now_ms: i64, at_ms: i64) -> i64 {
    now_ms.saturating_sub(at_ms)
}

fn timeout_ms(timeout: Duration) -> i64 {
    i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX)
}

/// 距最后访问的时长严格小于超时才算在线。
pub fn classify(now_ms: i64, last_access_ms: i64, timeout: Duration) -> ConnectionStatus {
    if age_ms(now_ms, last_access_ms) < timeout_ms(timeout) {
        ConnectionStatus::Online
    } else {
        ConnectionStatus::Offline
    }
}

pub fn evaluate_push(
    snapshot: &DeviceSnapshot,
    report: &StatusReport,
    now_ms: i64,
    timeout: Duration,
) -> PushDecision {
    let was_online = snapshot.connection_status.is_online();
    let report_is_fresh = classify(now_ms, report.observed_at_ms, timeout).is_online();

    if !was_online && report_is_fresh {
        return PushDecision::BecameOnline {
            last_access_ms: report.observed_at_ms,
        };
    }
    if was_online && report_is_fresh {
        let report_age = age_ms(now_ms, report.observed_at_ms);
        let snapshot_age = age_ms(now_ms, snapshot.last_access_ms);
        if report_age < snapshot_age {
            return PushDecision::Refreshed {
                last_access_ms: report.observed_at_ms,
            };
        }
    }
    PushDecision::NoOp
}

pub fn evaluate_pull(snapshot: &DeviceSnapshot, now_ms: i64, timeout: Duration) -> PullDecision {
    if snapshot.connection_status.is_online()
        && !classify(now_ms, snapshot.last_access_ms, timeout).is_online()
    {
        return PullDecision::WentOffline;
    }
    PullDecision::NoOp
}
