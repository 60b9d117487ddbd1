//! 应用运行配置加载。

use std::env;
use std::time::Duration;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_addr: String,
    /// 未配置时使用内存存储（演示模式）。
    pub database_url: Option<String>,
    pub tenant_id: String,
    pub project_id: String,
    pub connection_timeout_seconds: u64,
    pub poll_interval_seconds: u64,
    pub liveness_queue_capacity: usize,
    pub notify_capacity: usize,
    pub ingest_enabled: bool,
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_status_topic_prefix: String,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_addr = env::var("EMS_HTTP_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let database_url = read_optional("EMS_DATABASE_URL");
        let tenant_id = read_required("EMS_TENANT_ID")?;
        let project_id = read_required("EMS_PROJECT_ID")?;
        let connection_timeout_seconds =
            read_positive_u64_with_default("EMS_CONNECTION_TIMEOUT_SECONDS", 60)?;
        let poll_interval_seconds = read_positive_u64_with_default("EMS_POLL_INTERVAL_SECONDS", 20)?;
        let liveness_queue_capacity =
            read_positive_u64_with_default("EMS_LIVENESS_QUEUE_CAPACITY", 256)? as usize;
        let notify_capacity = read_positive_u64_with_default("EMS_NOTIFY_CAPACITY", 64)? as usize;
        let ingest_enabled = read_bool_with_default("EMS_INGEST", false);
        let mqtt_host = env::var("EMS_MQTT_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let mqtt_port = read_u16_with_default("EMS_MQTT_PORT", 1883)?;
        let mqtt_username = read_optional("EMS_MQTT_USERNAME");
        let mqtt_password = read_optional("EMS_MQTT_PASSWORD");
        let mqtt_status_topic_prefix = env::var("EMS_MQTT_STATUS_TOPIC_PREFIX")
            .unwrap_or_else(|_| "ems/status".to_string());

        Ok(Self {
            http_addr,
            database_url,
            tenant_id,
            project_id,
            connection_timeout_seconds,
            poll_interval_seconds,
            liveness_queue_capacity,
            notify_capacity,
            ingest_enabled,
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_status_topic_prefix,
        })
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

fn read_required(key: &str) -> Result<String, ConfigError> {
    read_optional(key).ok_or_else(|| ConfigError::Missing(key.to_string()))
}

fn read_u16_with_default(key: &str, default: u16) -> Result<u16, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u16>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

/// 读取正整数，0 视为非法（零间隔的定时器没有意义）。
fn read_positive_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    match value.trim().parse::<u64>() {
        Ok(parsed) if parsed > 0 => Ok(parsed),
        _ => Err(ConfigError::Invalid(key.to_string(), value)),
    }
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
