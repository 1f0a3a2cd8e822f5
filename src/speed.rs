use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MeasurementError, ParseError};
use crate::probe::ProbeRunner;

pub const SPEED_PROGRAM: &str = "speedtest";

const BYTES_PER_SEC_PER_MBPS: f64 = 125_000.0;

/// Result of one bandwidth test.
///
/// `raw_payload` keeps the probe's JSON as received; it is never re-parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeedMeasurement {
    #[serde(rename = "download")]
    pub download_mbps: f64,
    #[serde(rename = "upload")]
    pub upload_mbps: f64,
    #[serde(rename = "latency")]
    pub latency_ms: f64,
    #[serde(rename = "result")]
    pub raw_payload: String,
}

impl fmt::Display for SpeedMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Download:    {:.2}Mbps\nUpload:      {:.2}Mbps\nLatency:     {:.2}ms",
            self.download_mbps, self.upload_mbps, self.latency_ms
        )
    }
}

fn number_at(payload: &Value, pointer: &str, field: &'static str) -> Result<f64, ParseError> {
    payload
        .pointer(pointer)
        .and_then(Value::as_f64)
        .ok_or(ParseError::MissingSpeedField(field))
}

pub fn parse_speed(payload: &str) -> Result<SpeedMeasurement, ParseError> {
    let parsed: Value = serde_json::from_str(payload)?;
    let download = number_at(&parsed, "/download/bandwidth", "download.bandwidth")?;
    let upload = number_at(&parsed, "/upload/bandwidth", "upload.bandwidth")?;
    let latency_ms = number_at(&parsed, "/ping/latency", "ping.latency")?;

    Ok(SpeedMeasurement {
        download_mbps: download / BYTES_PER_SEC_PER_MBPS,
        upload_mbps: upload / BYTES_PER_SEC_PER_MBPS,
        latency_ms,
        raw_payload: payload.to_string(),
    })
}

pub fn measure_speed(runner: &dyn ProbeRunner) -> Result<SpeedMeasurement, MeasurementError> {
    let args = ["-f".to_string(), "json".to_string()];
    let output = runner.run(SPEED_PROGRAM, &args)?;
    Ok(parse_speed(&output)?)
}
