pub mod config;
pub mod error;
pub mod escalation;
pub mod html;
pub mod ping;
pub mod probe;
pub mod record;
pub mod report;
pub mod runner;
pub mod speed;
pub mod store;
pub mod summary;
pub mod trace;
pub mod viewer;

pub use config::AppConfig;
pub use error::{LoadError, MeasurementError, ParseError, ProbeError, StoreError};
pub use escalation::EscalationPolicy;
pub use ping::{PingCommand, PingMeasurement, parse_ping};
pub use probe::{CommandRunner, ProbeRunner};
pub use record::SampleRecord;
pub use report::{SeriesChart, render_human, render_series};
pub use runner::{DiagnosticRun, RunOptions, RunOutcome, run_diagnostics};
pub use speed::{SpeedMeasurement, parse_speed};
pub use store::RecordStore;
pub use summary::summarize;
pub use trace::{TraceMeasurement, TracedPath, extract_hop_addresses};
