use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::escalation::EscalationPolicy;
use crate::ping::PingMeasurement;
use crate::speed::SpeedMeasurement;
use crate::trace::TraceMeasurement;

pub fn current_timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs_f64()
}

pub fn local_time(timestamp: f64) -> DateTime<Local> {
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9) as u32;
    DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
        .unwrap_or_default()
        .with_timezone(&Local)
}

/// One diagnostic run: up to three measurements stamped with the time they were taken.
///
/// A trace only exists alongside the ping whose packet loss triggered it.
/// Records are immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PersistedRecord", into = "PersistedRecord")]
pub struct SampleRecord {
    timestamp: f64,
    ping: Option<PingMeasurement>,
    trace: Option<TraceMeasurement>,
    speed: Option<SpeedMeasurement>,
}

impl SampleRecord {
    pub fn new(
        timestamp: f64,
        ping: Option<PingMeasurement>,
        speed: Option<SpeedMeasurement>,
    ) -> Self {
        Self {
            timestamp,
            ping,
            trace: None,
            speed,
        }
    }

    /// A traced record. `None` unless `policy` escalates on `ping`.
    pub fn escalated(
        timestamp: f64,
        ping: PingMeasurement,
        trace: TraceMeasurement,
        speed: Option<SpeedMeasurement>,
        policy: &EscalationPolicy,
    ) -> Option<Self> {
        policy.should_trace(&ping).then(|| Self {
            timestamp,
            ping: Some(ping),
            trace: Some(trace),
            speed,
        })
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn ping(&self) -> Option<&PingMeasurement> {
        self.ping.as_ref()
    }

    pub fn trace(&self) -> Option<&TraceMeasurement> {
        self.trace.as_ref()
    }

    pub fn speed(&self) -> Option<&SpeedMeasurement> {
        self.speed.as_ref()
    }

    pub fn date(&self) -> DateTime<Local> {
        local_time(self.timestamp)
    }

    pub fn human_readable(&self) -> String {
        let mut lines = Vec::new();

        if let Some(ping) = &self.ping {
            lines.push(format!("Packet Loss: {:.2}%", ping.packet_loss_percent));
        }

        if let Some(trace) = &self.trace {
            for hop in &trace.hop_pings {
                lines.push(format!("{:.2}% {}", hop.packet_loss_percent, hop.target));
            }
        }

        if let Some(speed) = &self.speed {
            lines.push(speed.to_string());
        }

        lines.join("\n")
    }
}

/// On-disk shape of a record. Absent measurements are written as explicit nulls.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PersistedRecord {
    #[serde(rename = "pingResult")]
    ping_result: Option<PingMeasurement>,
    #[serde(rename = "traceResult")]
    trace_result: Option<TraceMeasurement>,
    #[serde(rename = "speedResult")]
    speed_result: Option<SpeedMeasurement>,
    #[serde(rename = "timeStamp")]
    time_stamp: f64,
}

impl TryFrom<PersistedRecord> for SampleRecord {
    type Error = String;

    fn try_from(persisted: PersistedRecord) -> Result<Self, Self::Error> {
        if persisted.trace_result.is_some() && persisted.ping_result.is_none() {
            return Err("traceResult present without pingResult".to_string());
        }
        if !persisted.time_stamp.is_finite() {
            return Err(format!("timeStamp {} is not finite", persisted.time_stamp));
        }
        Ok(Self {
            timestamp: persisted.time_stamp,
            ping: persisted.ping_result,
            trace: persisted.trace_result,
            speed: persisted.speed_result,
        })
    }
}

impl From<SampleRecord> for PersistedRecord {
    fn from(record: SampleRecord) -> Self {
        Self {
            ping_result: record.ping,
            trace_result: record.trace,
            speed_result: record.speed,
            time_stamp: record.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_taken_per_call() {
        let first = current_timestamp();
        std::thread::sleep(Duration::from_millis(5));
        assert!(current_timestamp() > first);
    }

    #[test]
    fn human_readable_lists_loss_hops_and_speed() {
        let record = SampleRecord::escalated(
            0.0,
            PingMeasurement::new("8.8.8.8", 5.0),
            TraceMeasurement {
                hop_pings: vec![
                    PingMeasurement::new("192.168.1.1", 0.0),
                    PingMeasurement::new("10.0.0.1", 12.5),
                ],
            },
            None,
            &EscalationPolicy::default(),
        )
        .unwrap();
        assert_eq!(
            record.human_readable(),
            "Packet Loss: 5.00%\n0.00% 192.168.1.1\n12.50% 10.0.0.1"
        );
    }

    #[test]
    fn escalated_needs_loss_above_threshold() {
        let policy = EscalationPolicy::new(3.0);
        let trace = TraceMeasurement::default();
        let at_threshold = PingMeasurement::new("8.8.8.8", 3.0);
        assert!(SampleRecord::escalated(0.0, at_threshold, trace.clone(), None, &policy).is_none());

        let above = PingMeasurement::new("8.8.8.8", 3.5);
        let record = SampleRecord::escalated(0.0, above, trace, None, &policy).unwrap();
        assert_eq!(record.trace(), Some(&TraceMeasurement::default()));
    }

    #[test]
    fn empty_record_prints_nothing() {
        assert_eq!(SampleRecord::new(1.0, None, None).human_readable(), "");
    }

    #[test]
    fn date_keeps_the_instant() {
        let record = SampleRecord::new(1_688_846_849.5, None, None);
        assert_eq!(record.date().timestamp(), 1_688_846_849);
        assert_eq!(record.date().timestamp_subsec_millis(), 500);
    }

    #[test]
    fn persisted_shape_uses_explicit_nulls() {
        let record = SampleRecord::new(12.5, Some(PingMeasurement::new("1.1.1.1", 0.0)), None);
        let value = serde_json::to_value(&record).unwrap();
        assert!(value["traceResult"].is_null());
        assert!(value["speedResult"].is_null());
        assert_eq!(value["timeStamp"], 12.5);
        assert_eq!(value["pingResult"]["ip"], "1.1.1.1");
    }

    #[test]
    fn trace_without_ping_is_rejected() {
        let raw = r#"{"pingResult":null,"traceResult":{"pingResults":[]},"speedResult":null,"timeStamp":1.0}"#;
        assert!(serde_json::from_str::<SampleRecord>(raw).is_err());
    }
}
