//! 设备连接状态相关的领域类型。

use std::fmt;

/// 设备连接状态。
///
/// 持久化时沿用 0/1 编码：0 = 离线，1 = 在线。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Online,
    Offline,
}

impl ConnectionStatus {
    pub fn is_online(self) -> bool {
        matches!(self, ConnectionStatus::Online)
    }

    pub fn as_i16(self) -> i16 {
        match self {
            ConnectionStatus::Online => 1,
            ConnectionStatus::Offline => 0,
        }
    }

    /// 非 1 的取值一律视为离线。
    pub fn from_i16(value: i16) -> Self {
        if value == 1 {
            ConnectionStatus::Online
        } else {
            ConnectionStatus::Offline
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::Online => "online",
            ConnectionStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 设备状态报文（由传输层产生，仅被推送路径消费一次）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub device_id: String,
    /// 报文内携带的观测时间（epoch 毫秒）。
    pub observed_at_ms: i64,
}

impl StatusReport {
    pub fn new(device_id: impl Into<String>, observed_at_ms: i64) -> Self {
        Self {
            device_id: device_id.into(),
            observed_at_ms,
        }
    }
}

/// 宿主前后台切换信号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    BecameActive,
    WillResignActive,
}
