use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{MeasurementError, ParseError, ProbeError};
use crate::probe::ProbeRunner;

pub const PING_PROGRAM: &str = "ping";

const ROOT_PING_COUNT: u32 = 400;
const USER_PING_COUNT: u32 = 10;

static PACKET_LOSS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\d.]+)%\s+packet\s+loss").expect("packet loss pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PingMeasurement {
    #[serde(rename = "ip")]
    pub target: String,
    #[serde(rename = "packetLoss")]
    pub packet_loss_percent: f64,
}

impl PingMeasurement {
    pub fn new(target: impl Into<String>, packet_loss_percent: f64) -> Self {
        Self {
            target: target.into(),
            packet_loss_percent,
        }
    }
}

impl fmt::Display for PingMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%: {}", self.packet_loss_percent, self.target)
    }
}

/// Extracts the packet loss percentage from ping output.
///
/// No match is a parse failure, never a 0% result.
pub fn parse_ping(target: &str, output: &str) -> Result<PingMeasurement, ParseError> {
    let captures = PACKET_LOSS_REGEX
        .captures(output)
        .ok_or(ParseError::MissingPacketLoss)?;
    let raw = &captures[1];
    let packet_loss_percent = raw
        .parse::<f64>()
        .map_err(|_| ParseError::InvalidPacketLoss(raw.to_string()))?;
    Ok(PingMeasurement::new(target, packet_loss_percent))
}

#[cfg(unix)]
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn is_root() -> bool {
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingCommand {
    pub count: u32,
    pub flood: bool,
}

impl PingCommand {
    /// Flood pings with a large sample when privileged, a small quiet run otherwise.
    pub fn for_privilege(root: bool, count: Option<u32>) -> Self {
        let default_count = if root { ROOT_PING_COUNT } else { USER_PING_COUNT };
        Self {
            count: count.unwrap_or(default_count),
            flood: root,
        }
    }

    pub fn args(&self, target: &str) -> Vec<String> {
        let mut args = Vec::with_capacity(5);
        if self.flood {
            args.push("-f".to_string());
        }
        args.push("-q".to_string());
        args.push("-c".to_string());
        args.push(self.count.to_string());
        args.push(target.to_string());
        args
    }
}

pub fn measure_ping(
    runner: &dyn ProbeRunner,
    command: &PingCommand,
    target: &str,
) -> Result<PingMeasurement, MeasurementError> {
    let output = match runner.run(PING_PROGRAM, &command.args(target)) {
        Ok(output) => output,
        // ping exits non-zero when replies go missing; its summary is still the measurement
        Err(ProbeError::Failed { stdout, .. }) if PACKET_LOSS_REGEX.is_match(&stdout) => stdout,
        Err(e) => return Err(e.into()),
    };
    Ok(parse_ping(target, &output)?)
}
