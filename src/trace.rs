use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::MeasurementError;
use crate::ping::{PingCommand, PingMeasurement, measure_ping};
use crate::probe::ProbeRunner;

pub const TRACE_PROGRAM: &str = "traceroute";

static DOTTED_QUAD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\b").expect("dotted quad pattern is valid")
});

static HOP_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\s+\S").expect("hop line pattern is valid"));

static HEADER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^traceroute to \S+ \((\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\)")
        .expect("header pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceMeasurement {
    #[serde(rename = "pingResults")]
    pub hop_pings: Vec<PingMeasurement>,
}

#[derive(Debug)]
pub struct HopFailure {
    pub hop: String,
    pub error: MeasurementError,
}

/// A finished trace plus the hops whose ping produced no measurement.
#[derive(Debug)]
pub struct TracedPath {
    pub measurement: TraceMeasurement,
    pub failures: Vec<HopFailure>,
}

/// Hop addresses in traceroute output, in hop order.
///
/// Only numbered hop lines count. The target is left out both by name and by
/// the address the header resolved it to. Repeated intermediate hops are kept.
pub fn extract_hop_addresses(output: &str, target: &str) -> Vec<String> {
    let resolved = output
        .lines()
        .find_map(|line| HEADER_REGEX.captures(line.trim_start()))
        .map(|captures| captures[1].to_string());

    output
        .lines()
        .filter(|line| HOP_LINE_REGEX.is_match(line))
        .filter_map(|line| DOTTED_QUAD_REGEX.captures(line))
        .map(|captures| captures[1].to_string())
        .filter(|address| address != target && Some(address) != resolved.as_ref())
        .collect()
}

/// Only a traceroute failure is an error; failed hop pings land in `failures`.
pub fn measure_trace(
    runner: &dyn ProbeRunner,
    command: &PingCommand,
    target: &str,
) -> Result<TracedPath, MeasurementError> {
    let output = runner.run(TRACE_PROGRAM, &[target.to_string()])?;
    let hops = extract_hop_addresses(&output, target);
    debug!("trace to {target} found {} hops", hops.len());

    let mut hop_pings = Vec::with_capacity(hops.len());
    let mut failures = Vec::new();
    for hop in hops {
        match measure_ping(runner, command, &hop) {
            Ok(measurement) => hop_pings.push(measurement),
            Err(error) => {
                warn!("skipping hop {hop}: {error}");
                failures.push(HopFailure { hop, error });
            }
        }
    }
    Ok(TracedPath {
        measurement: TraceMeasurement { hop_pings },
        failures,
    })
}
