//! 设备在线检测 Agent
//!
//! 装配持久化网关、在线检测服务、状态报文接入与宿主 HTTP 接口。
//! 宿主通过 `/api/lifecycle/*` 投递前后台信号，Ctrl-C 优雅退出。

mod handlers;
mod ingest;
mod middleware;
mod notifications;
mod routes;
mod utils;

use ems_config::AppConfig;
use ems_liveness::{
    BroadcastNotifier, LivenessConfig, LivenessService, Reconciler, SystemClock,
};
use ems_storage::{DeviceStatusStore, InMemoryDeviceStatusStore, PgDeviceStatusStore};
use ems_telemetry::init_tracing;
use std::sync::Arc;
use tracing::{info, warn};

/// 全局应用状态
#[derive(Clone)]
pub struct AppState {
    pub liveness: LivenessService,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = AppConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let store: Arc<dyn DeviceStatusStore> = match config.database_url.as_deref() {
        Some(database_url) => Arc::new(PgDeviceStatusStore::connect(database_url).await?),
        None => {
            warn!("EMS_DATABASE_URL not set, using in-memory device store");
            Arc::new(InMemoryDeviceStatusStore::new())
        }
    };

    let notifier = Arc::new(BroadcastNotifier::new(config.notify_capacity));
    let notification_task = notifications::spawn_notification_logger(notifier.subscribe());

    let liveness_config = LivenessConfig {
        connection_timeout: config.connection_timeout(),
        poll_interval: config.poll_interval(),
        queue_capacity: config.liveness_queue_capacity,
    };
    let reconciler = Reconciler::new(
        store,
        notifier,
        config.tenant_id.clone(),
        config.project_id.clone(),
        liveness_config.connection_timeout,
    );
    let (liveness, worker) =
        LivenessService::spawn(reconciler, Arc::new(SystemClock), liveness_config.clone());
    liveness.start().await?;
    info!(
        tenant_id = %config.tenant_id,
        project_id = %config.project_id,
        connection_timeout_seconds = config.connection_timeout_seconds,
        poll_interval_seconds = config.poll_interval_seconds,
        "liveness_started"
    );

    let ingest_task = ingest::spawn_ingest(&config, liveness.clone());

    let state = AppState {
        liveness: liveness.clone(),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!(http_addr = %config.http_addr, "http_listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ingest_task.abort();
    if let Err(err) = liveness.stop().await {
        warn!(error = %err, "liveness_stop_failed");
    }
    drop(liveness);
    // 所有句柄释放后 worker 退出，通知出口随之关闭
    if let Err(err) = worker.await {
        warn!(error = %err, "liveness_worker_join_failed");
    }
    notification_task.abort();
    info!("shutdown_complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl_c_listener_failed");
        std::future::pending::<()>().await;
    }
    info!("shutdown_requested");
}
