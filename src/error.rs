use std::path::PathBuf;
use thiserror::Error;

// process exit codes
pub const EXIT_PARSE_FAILURE: i32 = 2;
pub const EXIT_PROBE_FAILURE: i32 = 3;
pub const EXIT_LOAD_FAILURE: i32 = 4;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{program} not found")]
    NotFound { program: String },
    #[error("{program} exited with status {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    #[error("{program} did not finish within {secs}s")]
    Timeout { program: String, secs: u64 },
    #[error("failed to run {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("cannot find packet loss in ping output")]
    MissingPacketLoss,
    #[error("invalid packet loss value {0:?}")]
    InvalidPacketLoss(String),
    #[error("speed payload is not valid JSON: {0}")]
    InvalidSpeedPayload(#[from] serde_json::Error),
    #[error("speed payload is missing numeric field {0}")]
    MissingSpeedField(&'static str),
}

/// Reading the persisted record sequence failed. Always fatal to the whole load.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("record #{index} in {} is malformed: {source}", path.display())]
    Malformed {
        path: PathBuf,
        index: usize,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serializing record: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not find config directory")]
    NoConfigDir,
    #[error("config file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A measurement that was left out of a record, and why.
#[derive(Debug, Error)]
pub enum MeasurementError {
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl MeasurementError {
    pub fn exit_code(&self) -> i32 {
        match self {
            MeasurementError::Probe(_) => EXIT_PROBE_FAILURE,
            MeasurementError::Parse(_) => EXIT_PARSE_FAILURE,
        }
    }
}
