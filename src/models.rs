use std::fmt;

use serde::Serialize;
use time::OffsetDateTime;

/// Model name the downstream ingestion service expects for Minew sensors
pub const INGEST_SENSOR_TYPE: &str = "MST01";

/// Frame layout an advertisement was decoded with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
    /// S3 series environmental frame (0xA3, 0x03)
    S3Environmental,
    /// Connect V3 plain temperature/humidity frame (0xCA, 0x05)
    ConnectV3PlainTempHumidity,
    /// Connect V3 encrypted frame (0xCA, 0x1B)
    ConnectV3Encrypted,
    /// No known layout
    Unknown,
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FrameKind::S3Environmental => "S3 environmental",
            FrameKind::ConnectV3PlainTempHumidity => "Connect V3 temp/humidity",
            FrameKind::ConnectV3Encrypted => "Connect V3 encrypted",
            FrameKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// How much to trust a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Decoded with a known frame layout
    Exact,
    /// Best-effort guess from the fallback decoder
    Heuristic,
}

/// Decoded sensor reading from one advertisement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub battery_percent: Option<u8>,
    pub battery_voltage: Option<f64>,
    pub device_id: Option<String>,
    pub name: Option<String>,
    pub frame_kind: FrameKind,
    pub confidence: Confidence,
    pub source_hex: String,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
}

impl Reading {
    /// Device id with the `/2` namespace suffix removed, as a colon-separated MAC
    pub fn mac(&self) -> Option<String> {
        let id = self.device_id.as_deref()?;
        let raw = id.split('/').next().unwrap_or(id);
        if raw.is_empty() || raw.len() % 2 != 0 {
            return None;
        }
        let pairs: Vec<&str> = (0..raw.len())
            .step_by(2)
            .filter_map(|i| raw.get(i..i + 2))
            .collect();
        Some(pairs.join(":"))
    }

    /// Shape accepted by the ingestion service
    pub fn to_ingest_record(&self) -> IngestRecord {
        IngestRecord {
            sensor_type: INGEST_SENSOR_TYPE,
            mac: self.mac(),
            temperature: self.temperature,
            humidity: self.humidity,
            rssi: None,
        }
    }
}

/// JSON item posted to the ingestion service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestRecord {
    #[serde(rename = "type")]
    pub sensor_type: &'static str,
    pub mac: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub rssi: Option<i16>,
}

/// Per-device aggregate over a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSummary {
    pub device_id: String,
    pub name: Option<String>,
    pub samples: usize,
    pub latest_temperature: Option<f64>,
    pub latest_humidity: Option<f64>,
    pub mean_temperature: Option<f64>,
    pub mean_humidity: Option<f64>,
    #[serde(with = "time::serde::rfc3339")]
    pub aggregated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(device_id: Option<&str>) -> Reading {
        Reading {
            temperature: Some(21.5),
            humidity: Some(40.25),
            battery_percent: None,
            battery_voltage: None,
            device_id: device_id.map(str::to_string),
            name: Some("MST01".to_string()),
            frame_kind: FrameKind::ConnectV3PlainTempHumidity,
            confidence: Confidence::Exact,
            source_hex: "00".to_string(),
            received_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_mac_from_device_id() {
        assert_eq!(
            reading(Some("54534dcc4b73/2")).mac().as_deref(),
            Some("54:53:4d:cc:4b:73")
        );
        assert_eq!(reading(None).mac(), None);
        assert_eq!(reading(Some("abc/2")).mac(), None);
    }

    #[test]
    fn test_ingest_record_json() {
        let record = reading(Some("ac233fae3040/2")).to_ingest_record();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "MST01");
        assert_eq!(json["mac"], "ac:23:3f:ae:30:40");
        assert_eq!(json["temperature"], 21.5);
        assert_eq!(json["humidity"], 40.25);
        assert!(json["rssi"].is_null());
    }

    #[test]
    fn test_reading_json_shape() {
        let json = serde_json::to_value(reading(Some("ac233fae3040/2"))).unwrap();
        assert_eq!(json["frame_kind"], "connect_v3_plain_temp_humidity");
        assert_eq!(json["confidence"], "exact");
        assert_eq!(json["received_at"], "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_frame_kind_display() {
        assert_eq!(FrameKind::S3Environmental.to_string(), "S3 environmental");
        assert_eq!(FrameKind::Unknown.to_string(), "unknown");
    }
}
