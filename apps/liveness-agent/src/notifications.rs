//! 连接状态变化通知的消费方
//!
//! 通知不带负载，这里只记录日志；需要最新状态的一方自行查询 `/api/devices`。

use ems_liveness::ConnectivityChanged;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

pub fn spawn_notification_logger(
    mut receiver: broadcast::Receiver<ConnectivityChanged>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                Ok(ConnectivityChanged) => {
                    info!(target: "ems.liveness", "connectivity_changed");
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "ems.liveness", skipped = skipped, "connectivity_notifications_lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
