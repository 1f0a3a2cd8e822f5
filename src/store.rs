use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Deserialize;

use crate::error::{LoadError, StoreError};
use crate::record::SampleRecord;

/// An append-only file of records, one YAML document per run.
///
/// Each append is a single write of a whole document to a file opened in
/// append mode. There is no locking between processes sharing the file.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &SampleRecord) -> Result<(), StoreError> {
        let fragment = encode_fragment(record)?;
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_err)?;
        file.write_all(fragment.as_bytes()).map_err(io_err)?;
        debug!("appended record to {}", self.path.display());
        Ok(())
    }

    /// Every record in file order. One malformed document fails the whole load.
    pub fn load_all(&self) -> Result<Vec<SampleRecord>, LoadError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| LoadError::Io {
            path: self.path.clone(),
            source,
        })?;
        let records = decode_fragments(&contents).map_err(|(index, source)| LoadError::Malformed {
            path: self.path.clone(),
            index,
            source,
        })?;
        debug!("loaded {} records from {}", records.len(), self.path.display());
        Ok(records)
    }
}

pub fn encode_fragment(record: &SampleRecord) -> Result<String, serde_yaml::Error> {
    let body = serde_yaml::to_string(record)?;
    Ok(format!("---\n{body}...\n"))
}

pub fn decode_fragments(text: &str) -> Result<Vec<SampleRecord>, (usize, serde_yaml::Error)> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::Deserializer::from_str(text)
        .enumerate()
        .map(|(index, document)| SampleRecord::deserialize(document).map_err(|e| (index, e)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::EscalationPolicy;
    use crate::ping::PingMeasurement;
    use crate::speed::SpeedMeasurement;
    use crate::trace::TraceMeasurement;
    use tempfile::tempdir;

    fn speed() -> SpeedMeasurement {
        SpeedMeasurement {
            download_mbps: 58.542856,
            upload_mbps: 17.1212,
            latency_ms: 19.266,
            raw_payload: "{\n  \"type\": \"result\"\n}".to_string(),
        }
    }

    #[test]
    fn records_round_trip_through_a_file() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("results.yaml"));
        let plain = SampleRecord::new(
            1_688_846_849.123456,
            Some(PingMeasurement::new("8.8.8.8", 0.25)),
            Some(speed()),
        );
        let traced = SampleRecord::escalated(
            1_688_847_000.654321,
            PingMeasurement::new("8.8.8.8", 12.34),
            TraceMeasurement {
                hop_pings: vec![
                    PingMeasurement::new("192.168.1.1", 0.0),
                    PingMeasurement::new("192.168.1.1", 1.5),
                ],
            },
            None,
            &EscalationPolicy::default(),
        )
        .unwrap();

        store.append(&plain).unwrap();
        store.append(&traced).unwrap();

        assert_eq!(store.load_all().unwrap(), vec![plain, traced]);
    }

    #[test]
    fn absent_trace_differs_from_empty_trace() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("results.yaml"));
        let ping = PingMeasurement::new("8.8.8.8", 4.0);
        let absent = SampleRecord::new(1.0, Some(ping.clone()), None);
        let policy = EscalationPolicy::default();
        let empty =
            SampleRecord::escalated(2.0, ping, TraceMeasurement::default(), None, &policy).unwrap();

        store.append(&absent).unwrap();
        store.append(&empty).unwrap();
        let loaded = store.load_all().unwrap();

        assert!(loaded[0].trace().is_none());
        assert_eq!(loaded[1].trace(), Some(&TraceMeasurement::default()));
    }

    #[test]
    fn fragment_has_document_markers_and_nulls() {
        let fragment = encode_fragment(&SampleRecord::new(5.0, None, None)).unwrap();
        assert!(fragment.starts_with("---\n"));
        assert!(fragment.ends_with("...\n"));
        assert!(fragment.contains("pingResult: null"));
        assert!(fragment.contains("traceResult: null"));
        assert!(fragment.contains("speedResult: null"));
        assert!(fragment.contains("timeStamp: 5.0"));
    }

    #[test]
    fn empty_file_loads_nothing() {
        assert!(decode_fragments("").unwrap().is_empty());
        assert!(decode_fragments("\n\n").unwrap().is_empty());
    }

    #[test]
    fn unknown_fields_fail_the_whole_load() {
        let good = encode_fragment(&SampleRecord::new(1.0, None, None)).unwrap();
        let bad = "---\npingResult: null\ntraceResult: null\nspeedResult: null\ntimeStamp: 2.0\nextra: 1\n...\n";
        let err = decode_fragments(&format!("{good}{bad}")).unwrap_err();
        assert_eq!(err.0, 1);
    }

    #[test]
    fn wrong_types_are_rejected() {
        let bad = "---\npingResult: {ip: 8.8.8.8, packetLoss: lots}\ntraceResult: null\nspeedResult: null\ntimeStamp: 2.0\n...\n";
        assert!(decode_fragments(bad).is_err());
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let dir = tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("nope.yaml"));
        assert!(matches!(store.load_all(), Err(LoadError::Io { .. })));
    }
}
