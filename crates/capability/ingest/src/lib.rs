//! 设备状态报文接入
//!
//! 传输层只负责把 MQTT 消息转换成 [`InboundReport`] 并交给处理器，
//! 报文是否有效、是否属于本检测器由处理器决定。

use async_trait::async_trait;
use domain::StatusReport;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

mod payload;

pub use payload::parse_status_payload;

/// 采集错误。
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("handler error: {0}")]
    Handler(String),
    #[error("source error: {0}")]
    Source(String),
    #[error("payload error: {0}")]
    Payload(String),
}

/// 带作用域的状态报文。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundReport {
    pub tenant_id: String,
    pub project_id: String,
    pub report: StatusReport,
}

/// 状态报文处理器。
#[async_trait]
pub trait StatusReportHandler: Send + Sync {
    async fn handle(&self, inbound: InboundReport) -> Result<(), IngestError>;
}

/// 采集源抽象。
#[async_trait]
pub trait Source: Send + Sync {
    async fn run(&self, handler: Arc<dyn StatusReportHandler>) -> Result<(), IngestError>;
}

/// 占位源（用于接线与测试）。
#[derive(Debug, Default)]
pub struct NoopSource;

#[async_trait]
impl Source for NoopSource {
    async fn run(&self, _handler: Arc<dyn StatusReportHandler>) -> Result<(), IngestError> {
        Ok(())
    }
}

/// MQTT 采集源配置。
#[derive(Debug, Clone)]
pub struct MqttSourceConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
}

/// MQTT 采集源：订阅 `{prefix}/#`，断线后由 eventloop 自动重连。
#[derive(Debug, Clone)]
pub struct MqttSource {
    config: MqttSourceConfig,
}

impl MqttSource {
    pub fn new(config: MqttSourceConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Source for MqttSource {
    async fn run(&self, handler: Arc<dyn StatusReportHandler>) -> Result<(), IngestError> {
        let client_id = format!("ems-liveness-ingest-{}", uuid::Uuid::new_v4());
        let mut options =
            MqttOptions::new(client_id, self.config.host.clone(), self.config.port);
        options.set_keep_alive(Duration::from_secs(30));
        if let (Some(username), Some(password)) =
            (self.config.username.as_ref(), self.config.password.as_ref())
        {
            options.set_credentials(username, password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, 10);
        let topic = format!("{}/#", self.config.topic_prefix.trim_end_matches('/'));
        client
            .subscribe(topic.clone(), QoS::AtLeastOnce)
            .await
            .map_err(|err| IngestError::Source(err.to_string()))?;
        info!(target: "ems.ingest", topic = %topic, "status_subscription_requested");

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let Some(scope) = extract_scope(&self.config.topic_prefix, &publish.topic) else {
                        warn!(target: "ems.ingest", "status topic skipped: {}", publish.topic);
                        continue;
                    };
                    let report = match parse_status_payload(&publish.payload, scope.device_id.as_deref()) {
                        Ok(report) => report,
                        Err(err) => {
                            warn!(
                                target: "ems.ingest",
                                topic = %publish.topic,
                                error = %err,
                                "status_payload_invalid"
                            );
                            continue;
                        }
                    };
                    debug!(
                        target: "ems.ingest",
                        tenant_id = %scope.tenant_id,
                        project_id = %scope.project_id,
                        device_id = %report.device_id,
                        observed_at_ms = report.observed_at_ms,
                        "status_report_received"
                    );
                    let inbound = InboundReport {
                        tenant_id: scope.tenant_id,
                        project_id: scope.project_id,
                        report,
                    };
                    if let Err(err) = handler.handle(inbound).await {
                        warn!(target: "ems.ingest", "status report handler failed: {}", err);
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    warn!(target: "ems.ingest", "mqtt status eventloop error: {}", err);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    }
}

/// topic 中解析出的作用域。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicScope {
    pub tenant_id: String,
    pub project_id: String,
    pub device_id: Option<String>,
}

/// 解析 `{prefix}/{tenant}/{project}[/.../{device}]`，设备 ID 取最后一段。
pub fn extract_scope(prefix: &str, topic: &str) -> Option<TopicScope> {
    let prefix = prefix.trim_matches('/');
    let topic = topic.trim_matches('/');
    let rest = if prefix.is_empty() {
        topic
    } else {
        topic.strip_prefix(prefix)?
    };
    if !prefix.is_empty() && !rest.is_empty() && !rest.starts_with('/') {
        return None;
    }
    let parts: Vec<&str> = rest
        .split('/')
        .filter(|part| !part.is_empty())
        .collect();
    if parts.len() < 2 {
        return None;
    }
    let device_id = if parts.len() > 2 {
        parts.last().map(|part| part.to_string())
    } else {
        None
    };
    Some(TopicScope {
        tenant_id: parts[0].to_string(),
        project_id: parts[1].to_string(),
        device_id,
    })
}
