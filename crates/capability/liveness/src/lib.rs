//! # EMS Liveness 模块
//!
//! 设备在线/离线检测（failure detector）。
//!
//! ## 组成
//!
//! - `snapshot`：内存中的设备快照集合
//! - `evaluator`：纯函数判定（报文推送、周期拉取）
//! - `reconciler`：判定结果落到快照，必要时写回持久化存储并通知
//! - `service`：单 worker 串行调度，处理定时器、报文与宿主生命周期信号
//! - `notify`：连接状态变化通知出口
//! - `clock`：时钟抽象
//!
//! ## 判定规则
//!
//! `now - last_access < connection_timeout` 判定在线，否则离线（恰好等于超时视为离线）。
//! 只有真实翻转（在线 ↔ 离线）才写回持久化存储；通知在写回提交之后发出。

pub mod clock;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod notify;
pub mod reconciler;
pub mod service;
pub mod snapshot;

pub use clock::{Clock, SystemClock, now_epoch_ms};
pub use config::LivenessConfig;
pub use error::LivenessError;
pub use evaluator::{PullDecision, PushDecision, age_ms, classify, evaluate_pull, evaluate_push};
pub use notify::{BroadcastNotifier, ConnectivityChanged, NoopNotifier, NotificationSink};
pub use reconciler::{PullSummary, PushOutcome, Reconciler, WriteBack};
pub use service::{LifecycleState, LivenessService};
pub use snapshot::{DeviceSnapshot, SnapshotSet};
