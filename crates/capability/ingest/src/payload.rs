//! 设备状态报文解析
//!
//! 兼容两种负载：
//! - `{"time": 1700000000.5, "args": {"ObjectID": 42}}`（秒，浮点）
//! - `{"deviceId": "desk-42", "tsMs": 1700000000500}`
//!
//! 负载里没有设备 ID 时使用 topic 的最后一段。

use crate::IngestError;
use domain::StatusReport;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DeviceIdField {
    Text(String),
    Number(i64),
}

impl DeviceIdField {
    fn into_string(self) -> String {
        match self {
            DeviceIdField::Text(value) => value,
            DeviceIdField::Number(value) => value.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct StatusArgs {
    #[serde(rename = "ObjectID", alias = "objectId")]
    object_id: Option<DeviceIdField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusPayload {
    #[serde(alias = "device_id")]
    device_id: Option<DeviceIdField>,
    #[serde(alias = "ts_ms", alias = "timeMs")]
    ts_ms: Option<i64>,
    /// epoch 秒。
    time: Option<f64>,
    #[serde(default)]
    args: StatusArgs,
}

/// 解析状态报文。`topic_device_id` 为 topic 中携带的设备 ID（可选）。
pub fn parse_status_payload(
    payload: &[u8],
    topic_device_id: Option<&str>,
) -> Result<StatusReport, IngestError> {
    if payload.iter().all(|byte| byte.is_ascii_whitespace()) {
        return Err(IngestError::Payload("empty payload".to_string()));
    }
    let parsed: StatusPayload =
        serde_json::from_slice(payload).map_err(|err| IngestError::Payload(err.to_string()))?;

    let device_id = non_empty(parsed.device_id.map(DeviceIdField::into_string))
        .or_else(|| non_empty(parsed.args.object_id.map(DeviceIdField::into_string)))
        .or_else(|| non_empty(topic_device_id.map(str::to_string)))
        .ok_or_else(|| IngestError::Payload("missing device id".to_string()))?;

    let observed_at_ms = match (parsed.ts_ms, parsed.time) {
        (Some(ts_ms), _) => ts_ms,
        (None, Some(seconds)) => seconds_to_ms(seconds)?,
        (None, None) => return Err(IngestError::Payload("missing observation time".to_string())),
    };

    Ok(StatusReport::new(device_id, observed_at_ms))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn seconds_to_ms(seconds: f64) -> Result<i64, IngestError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(IngestError::Payload(format!("invalid time: {}", seconds)));
    }
    Ok((seconds * 1000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seconds_and_object_id() {
        let payload = br#"{"time": 1700000000.25, "args": {"ObjectID": 42}}"#;
        let report = parse_status_payload(payload, None).expect("report");
        assert_eq!(report.device_id, "42");
        assert_eq!(report.observed_at_ms, 1_700_000_000_250);
    }

    #[test]
    fn parses_millis_and_device_id() {
        let payload = br#"{"deviceId": "desk-7", "tsMs": 1700000000500}"#;
        let report = parse_status_payload(payload, Some("ignored")).expect("report");
        assert_eq!(report.device_id, "desk-7");
        assert_eq!(report.observed_at_ms, 1_700_000_000_500);
    }

    #[test]
    fn falls_back_to_topic_device_id() {
        let payload = br#"{"tsMs": 1700000000000}"#;
        let report = parse_status_payload(payload, Some("desk-9")).expect("report");
        assert_eq!(report.device_id, "desk-9");
    }

    #[test]
    fn blank_device_id_falls_back_to_object_id_then_topic() {
        let payload = br#"{"deviceId": "", "time": 1700000000.0, "args": {"ObjectID": 42}}"#;
        let report = parse_status_payload(payload, Some("desk-9")).expect("report");
        assert_eq!(report.device_id, "42");

        let payload = br#"{"deviceId": " ", "tsMs": 1700000000000}"#;
        let report = parse_status_payload(payload, Some("desk-9")).expect("report");
        assert_eq!(report.device_id, "desk-9");
    }

    #[test]
    fn rejects_missing_device_id() {
        let payload = br#"{"time": 1700000000.0}"#;
        let err = parse_status_payload(payload, None).expect_err("missing id");
        assert!(err.to_string().contains("missing device id"));
    }

    #[test]
    fn rejects_missing_time() {
        let payload = br#"{"deviceId": "desk-1"}"#;
        assert!(parse_status_payload(payload, None).is_err());
    }

    #[test]
    fn rejects_negative_time_and_garbage() {
        assert!(parse_status_payload(br#"{"deviceId":"a","time":-1.0}"#, None).is_err());
        assert!(parse_status_payload(b"online", None).is_err());
        assert!(parse_status_payload(b"  ", None).is_err());
    }
}
