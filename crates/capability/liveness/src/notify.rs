//! 连接状态变化通知
//!
//! 通知不携带负载，订阅方收到后自行重新查询状态。发送是非阻塞的，
//! 检测轮次不会等待订阅方处理完成。

use tokio::sync::broadcast;
use tracing::debug;

/// "有设备的连接状态变了"。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityChanged;

/// 通知出口（fire-and-forget）。
pub trait NotificationSink: Send + Sync {
    fn notify_connectivity_changed(&self);
}

/// 基于 broadcast channel 的通知出口。
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ConnectivityChanged>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityChanged> {
        self.sender.subscribe()
    }
}

impl NotificationSink for BroadcastNotifier {
    fn notify_connectivity_changed(&self) {
        // 没有订阅方时 send 返回错误，直接丢弃即可
        if self.sender.send(ConnectivityChanged).is_err() {
            debug!(target: "ems.liveness", "connectivity_changed_no_subscriber");
        }
    }
}

/// 空通知出口（用于接线与测试）。
#[derive(Debug, Default)]
pub struct NoopNotifier;

impl NotificationSink for NoopNotifier {
    fn notify_connectivity_changed(&self) {}
}
