//! 状态报文接入装配
//!
//! 把 MQTT 采集源接到在线检测服务上：只转发本检测器租户/项目下的报文，
//! 其余报文记录后丢弃。

use async_trait::async_trait;
use ems_config::AppConfig;
use ems_ingest::{
    InboundReport, IngestError, MqttSource, MqttSourceConfig, NoopSource, Source,
    StatusReportHandler,
};
use ems_liveness::LivenessService;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 把状态报文投递到在线检测服务。
pub struct LivenessReportHandler {
    liveness: LivenessService,
    tenant_id: String,
    project_id: String,
}

impl LivenessReportHandler {
    pub fn new(
        liveness: LivenessService,
        tenant_id: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            liveness,
            tenant_id: tenant_id.into(),
            project_id: project_id.into(),
        }
    }
}

#[async_trait]
impl StatusReportHandler for LivenessReportHandler {
    async fn handle(&self, inbound: InboundReport) -> Result<(), IngestError> {
        if inbound.tenant_id != self.tenant_id || inbound.project_id != self.project_id {
            debug!(
                target: "ems.ingest",
                tenant_id = %inbound.tenant_id,
                project_id = %inbound.project_id,
                device_id = %inbound.report.device_id,
                "status_report_out_of_scope"
            );
            return Ok(());
        }
        self.liveness
            .submit_report(inbound.report)
            .await
            .map_err(|err| IngestError::Handler(err.to_string()))
    }
}

/// 启动采集任务。`EMS_INGEST` 关闭时使用空操作源。
pub fn spawn_ingest(config: &AppConfig, liveness: LivenessService) -> tokio::task::JoinHandle<()> {
    let handler = Arc::new(LivenessReportHandler::new(
        liveness,
        config.tenant_id.clone(),
        config.project_id.clone(),
    ));

    let source: Arc<dyn Source> = if config.ingest_enabled {
        let mqtt_config = MqttSourceConfig {
            host: config.mqtt_host.clone(),
            port: config.mqtt_port,
            username: config.mqtt_username.clone(),
            password: config.mqtt_password.clone(),
            topic_prefix: config.mqtt_status_topic_prefix.clone(),
        };
        info!(
            "ingest source: mqtt {}:{} prefix={}",
            mqtt_config.host, mqtt_config.port, mqtt_config.topic_prefix
        );
        Arc::new(MqttSource::new(mqtt_config))
    } else {
        info!("ingest source: noop (EMS_INGEST=off)");
        Arc::new(NoopSource)
    };

    tokio::spawn(async move {
        if let Err(err) = source.run(handler).await {
            warn!("ingest stopped: {}", err);
        }
    })
}
