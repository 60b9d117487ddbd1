//! 在线检测参数。

use std::time::Duration;

/// 默认连接超时：超过 60 秒没有报文即判定离线。
pub const DEFAULT_CONNECTION_TIMEOUT: Duration = Duration::from_secs(60);
/// 默认周期检测间隔。
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);
/// 默认触发队列容量。
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// 在线检测参数。
///
/// 离线最迟在 `connection_timeout + poll_interval` 内被发现。
#[derive(Debug, Clone)]
pub struct LivenessConfig {
    pub connection_timeout: Duration,
    pub poll_interval: Duration,
    pub queue_capacity: usize,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            connection_timeout: DEFAULT_CONNECTION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl LivenessConfig {
    /// 零值回落到默认值（零间隔的定时器会直接 panic）。
    pub fn sanitized(mut self) -> Self {
        if self.connection_timeout.is_zero() {
            self.connection_timeout = DEFAULT_CONNECTION_TIMEOUT;
        }
        if self.poll_interval.is_zero() {
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        if self.queue_capacity == 0 {
            self.queue_capacity = DEFAULT_QUEUE_CAPACITY;
        }
        self
    }
}
