//! 调度与触发控制
//!
//! 周期定时器（拉取路径）、状态报文（推送路径）、宿主生命周期信号和查询请求
//! 全部进入同一个有界队列，由单个 worker 串行消费。worker 独占 [`Reconciler`]，
//! 因此任意两次检测轮次都不会交错读改写同一个快照。
//!
//! 生命周期：
//!
//! ```text
//!            start / 首个报文                 suspend
//!  Stopped ─────────────────────► Running ───────────► Suspended
//!     ▲                              ▲  ◄───────────────    │
//!     │            stop              │       resume         │
//!     └──────────────────────────────┴──────────────────────┘
//! ```
//!
//! - 启动前的 suspend / resume 为空操作
//! - Suspended 期间仍处理报文，但不做周期检测和设备合并
//! - 重复 suspend / resume 为空操作，resume 不补跑检测

use crate::clock::Clock;
use crate::config::LivenessConfig;
use crate::error::LivenessError;
use crate::reconciler::{PushOutcome, Reconciler};
use crate::snapshot::DeviceSnapshot;
use domain::{HostSignal, StatusReport};
use ems_telemetry::{record_pull_pass, record_report_received};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// 调度器状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Stopped,
    Running,
    Suspended,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Stopped => "stopped",
            LifecycleState::Running => "running",
            LifecycleState::Suspended => "suspended",
        }
    }
}

enum Trigger {
    Start,
    Stop,
    Suspend,
    Resume,
    Report(StatusReport),
    Snapshot(oneshot::Sender<Vec<DeviceSnapshot>>),
    State(oneshot::Sender<LifecycleState>),
}

/// 在线检测服务句柄（可克隆，所有句柄释放后 worker 退出）。
#[derive(Clone)]
pub struct LivenessService {
    sender: mpsc::Sender<Trigger>,
}

impl LivenessService {
    /// 启动 worker。服务处于 Stopped，直到调用 `start` 或收到首个报文。
    pub fn spawn(
        reconciler: Reconciler,
        clock: Arc<dyn Clock>,
        config: LivenessConfig,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let config = config.sanitized();
        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let worker = Worker {
            reconciler,
            clock,
            poll_interval: config.poll_interval,
            state: LifecycleState::Stopped,
            timer: None,
        };
        let handle = tokio::spawn(worker.run(receiver));
        (Self { sender }, handle)
    }

    pub async fn start(&self) -> Result<(), LivenessError> {
        self.send(Trigger::Start).await
    }

    pub async fn stop(&self) -> Result<(), LivenessError> {
        self.send(Trigger::Stop).await
    }

    pub async fn suspend(&self) -> Result<(), LivenessError> {
        self.send(Trigger::Suspend).await
    }

    pub async fn resume(&self) -> Result<(), LivenessError> {
        self.send(Trigger::Resume).await
    }

    pub async fn host_signal(&self, signal: HostSignal) -> Result<(), LivenessError> {
        match signal {
            HostSignal::BecameActive => self.resume().await,
            HostSignal::WillResignActive => self.suspend().await,
        }
    }

    pub async fn submit_report(&self, report: StatusReport) -> Result<(), LivenessError> {
        self.send(Trigger::Report(report)).await
    }

    /// 当前快照（按设备 ID 排序）。
    pub async fn snapshot(&self) -> Result<Vec<DeviceSnapshot>, LivenessError> {
        let (reply, response) = oneshot::channel();
        self.send(Trigger::Snapshot(reply)).await?;
        response.await.map_err(|_| LivenessError::Closed)
    }

    pub async fn state(&self) -> Result<LifecycleState, LivenessError> {
        let (reply, response) = oneshot::channel();
        self.send(Trigger::State(reply)).await?;
        response.await.map_err(|_| LivenessError::Closed)
    }

    async fn send(&self, trigger: Trigger) -> Result<(), LivenessError> {
        self.sender
            .send(trigger)
            .await
            .map_err(|_| LivenessError::Closed)
    }
}

struct Worker {
    reconciler: Reconciler,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    state: LifecycleState,
    timer: Option<Interval>,
}

impl Worker {
    async fn run(mut self, mut receiver: mpsc::Receiver<Trigger>) {
        loop {
            tokio::select! {
                trigger = receiver.recv() => match trigger {
                    Some(trigger) => self.handle(trigger).await,
                    None => break,
                },
                _ = next_tick(&mut self.timer) => self.on_tick().await,
            }
        }
        info!(target: "ems.liveness", "liveness_worker_stopped");
    }

    async fn handle(&mut self, trigger: Trigger) {
        match trigger {
            Trigger::Start => {
                if self.state == LifecycleState::Stopped {
                    self.setup().await;
                } else {
                    debug!(target: "ems.liveness", state = self.state.as_str(), "start_ignored");
                }
            }
            Trigger::Stop => {
                self.timer = None;
                self.reconciler.clear();
                self.transition(LifecycleState::Stopped);
            }
            Trigger::Suspend => {
                if self.state == LifecycleState::Running {
                    self.timer = None;
                    self.transition(LifecycleState::Suspended);
                }
            }
            Trigger::Resume => {
                if self.state == LifecycleState::Suspended {
                    self.timer = Some(new_timer(self.poll_interval));
                    self.transition(LifecycleState::Running);
                }
            }
            Trigger::Report(report) => {
                record_report_received();
                if self.state == LifecycleState::Stopped {
                    self.setup().await;
                }
                let now_ms = self.clock.now_ms();
                let outcome = self.reconciler.apply_push(&report, now_ms).await;
                debug!(
                    target: "ems.liveness",
                    device_id = %report.device_id,
                    observed_at_ms = report.observed_at_ms,
                    outcome = ?outcome,
                    "status_report_applied"
                );
                if outcome == PushOutcome::ReloadFailed {
                    warn!(target: "ems.liveness", device_id = %report.device_id, "status_report_dropped");
                }
            }
            Trigger::Snapshot(reply) => {
                let _ = reply.send(self.reconciler.snapshot_list());
            }
            Trigger::State(reply) => {
                let _ = reply.send(self.state);
            }
        }
    }

    /// 首次装配：从持久化存储加载设备并启动定时器。
    ///
    /// 加载失败时仍进入 Running，空集合会在下一个报文到达时触发重载。
    async fn setup(&mut self) {
        if let Err(err) = self.reconciler.reload().await {
            warn!(target: "ems.liveness", error = %err, "liveness_setup_load_failed");
        }
        self.timer = Some(new_timer(self.poll_interval));
        self.transition(LifecycleState::Running);
    }

    async fn on_tick(&mut self) {
        if self.state != LifecycleState::Running {
            return;
        }
        let now_ms = self.clock.now_ms();
        let summary = self.reconciler.apply_pull(now_ms).await;
        record_pull_pass();
        info!(
            target: "ems.liveness",
            evaluated = summary.evaluated,
            went_offline = summary.went_offline,
            written = summary.written,
            already_recorded = summary.already_recorded,
            retried = summary.retried,
            superseded = summary.superseded,
            deferred = summary.deferred,
            dropped = summary.dropped,
            merged = summary.merged,
            "pull_pass_completed"
        );
    }

    fn transition(&mut self, next: LifecycleState) {
        if self.state != next {
            info!(
                target: "ems.liveness",
                from = self.state.as_str(),
                to = next.as_str(),
                "lifecycle_transition"
            );
            self.state = next;
        }
    }
}

/// 首次触发在一个完整周期之后。
fn new_timer(period: Duration) -> Interval {
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

async fn next_tick(timer: &mut Option<Interval>) {
    match timer.as_mut() {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
