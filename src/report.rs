use serde::Serialize;

use crate::record::SampleRecord;
use crate::speed::SpeedMeasurement;
use crate::summary::{mean, summarize};

pub const CHART_TITLE: &str = "Internet Status";
pub const DOWNLOAD_REFERENCE_MBPS: f64 = 50.0;
pub const UPLOAD_REFERENCE_MBPS: f64 = 15.0;
pub const LATENCY_REFERENCE_MS: f64 = 20.0;
pub const PACKET_LOSS_REFERENCE_PERCENT: f64 = 3.0;

pub fn render_human(records: &[SampleRecord]) -> String {
    let download = column(records, |r| r.speed().map(|s| s.download_mbps));
    let upload = column(records, |r| r.speed().map(|s| s.upload_mbps));
    let latency = column(records, |r| r.speed().map(|s| s.latency_ms));
    let loss = column(records, |r| r.ping().map(|p| p.packet_loss_percent));

    [
        summarize(&download, "Download", "Mbps"),
        summarize(&upload, "Upload", "Mbps"),
        summarize(&latency, "Latency", "ms"),
        summarize(&loss, "Packet Loss", "%"),
    ]
    .join("\n\n")
}

fn column(records: &[SampleRecord], value: impl Fn(&SampleRecord) -> Option<f64>) -> Vec<Option<f64>> {
    records.iter().map(value).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Axis {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    pub axis: Axis,
    pub points: Vec<(f64, f64)>,
}

impl Series {
    /// Legend names carry the series average when there is one.
    fn new(label: &str, axis: Axis, points: Vec<(f64, f64)>) -> Self {
        let values: Vec<f64> = points.iter().map(|&(_, v)| v).collect();
        let name = match mean(&values) {
            Some(avg) => format!("{label} (avg: {avg:.2})"),
            None => label.to_string(),
        };
        Self { name, axis, points }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub value: f64,
    pub axis: Axis,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub y_title: String,
    pub secondary_y_title: Option<String>,
    pub series: Vec<Series>,
    pub reference_lines: Vec<ReferenceLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceColumn {
    pub timestamp: f64,
    pub hops: Vec<String>,
}

/// Everything a chart sink needs, already sorted by capture time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesChart {
    pub title: String,
    pub x_title: String,
    pub speed: Panel,
    pub packet_loss: Panel,
    pub traces: Vec<TraceColumn>,
    /// Capture times of records missing a speed or a ping measurement.
    pub gaps: Vec<f64>,
}

impl SeriesChart {
    pub fn panels(&self) -> [&Panel; 2] {
        [&self.speed, &self.packet_loss]
    }

    pub fn time_range(&self) -> Option<(f64, f64)> {
        let times = self
            .panels()
            .into_iter()
            .flat_map(|panel| panel.series.iter())
            .flat_map(|series| series.points.iter().map(|&(t, _)| t))
            .chain(self.gaps.iter().copied())
            .chain(self.traces.iter().map(|c| c.timestamp));
        times.fold(None, |range, t| match range {
            None => Some((t, t)),
            Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
        })
    }
}

pub fn render_series(records: &[SampleRecord]) -> SeriesChart {
    let mut sorted: Vec<&SampleRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.timestamp().total_cmp(&b.timestamp()));

    let speed_points = |field: fn(&SpeedMeasurement) -> f64| -> Vec<(f64, f64)> {
        sorted
            .iter()
            .filter_map(|r| r.speed().map(|s| (r.timestamp(), field(s))))
            .collect()
    };

    let speed = Panel {
        y_title: "Internet Speed(Mbps)".to_string(),
        secondary_y_title: Some("Latency(ms)".to_string()),
        series: vec![
            Series::new("Download", Axis::Primary, speed_points(|s| s.download_mbps)),
            Series::new("Upload", Axis::Primary, speed_points(|s| s.upload_mbps)),
            Series::new("Latency", Axis::Secondary, speed_points(|s| s.latency_ms)),
        ],
        reference_lines: vec![
            ReferenceLine {
                value: DOWNLOAD_REFERENCE_MBPS,
                axis: Axis::Primary,
                label: Some("50Mbps".to_string()),
            },
            ReferenceLine {
                value: UPLOAD_REFERENCE_MBPS,
                axis: Axis::Primary,
                label: Some("15Mbps".to_string()),
            },
            ReferenceLine {
                value: LATENCY_REFERENCE_MS,
                axis: Axis::Secondary,
                label: None,
            },
        ],
    };

    let loss_points = sorted
        .iter()
        .filter_map(|r| r.ping().map(|p| (r.timestamp(), p.packet_loss_percent)))
        .collect();
    let packet_loss = Panel {
        y_title: "% Packet Loss".to_string(),
        secondary_y_title: None,
        series: vec![Series::new("Packet Loss", Axis::Primary, loss_points)],
        reference_lines: vec![ReferenceLine {
            value: PACKET_LOSS_REFERENCE_PERCENT,
            axis: Axis::Primary,
            label: Some("3%".to_string()),
        }],
    };

    let traces = sorted
        .iter()
        .filter_map(|r| {
            r.trace().map(|t| TraceColumn {
                timestamp: r.timestamp(),
                hops: t.hop_pings.iter().map(ToString::to_string).collect(),
            })
        })
        .collect();

    let gaps = sorted
        .iter()
        .filter(|r| r.speed().is_none() || r.ping().is_none())
        .map(|r| r.timestamp())
        .collect();

    SeriesChart {
        title: CHART_TITLE.to_string(),
        x_title: "Test Time".to_string(),
        speed,
        packet_loss,
        traces,
        gaps,
    }
}
