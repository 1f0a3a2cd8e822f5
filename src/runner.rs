use log::{debug, error, info, warn};

use crate::error::MeasurementError;
use crate::escalation::EscalationPolicy;
use crate::ping::{PingCommand, PingMeasurement, measure_ping};
use crate::probe::ProbeRunner;
use crate::record::{SampleRecord, current_timestamp};
use crate::speed::{SPEED_PROGRAM, SpeedMeasurement, measure_speed};
use crate::trace::{TraceMeasurement, measure_trace};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub target: String,
    pub ping: PingCommand,
    pub policy: EscalationPolicy,
    pub skip_ping: bool,
    pub skip_speed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    PingPending,
    TracePending,
    SpeedPending,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Measurement {
    Ping,
    Trace,
    HopPing,
    Speed,
}

#[derive(Debug)]
pub struct Omission {
    pub measurement: Measurement,
    pub error: MeasurementError,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub record: SampleRecord,
    pub omissions: Vec<Omission>,
}

impl RunOutcome {
    /// Zero when everything that ran succeeded. A parse failure outranks a probe failure.
    pub fn exit_code(&self) -> i32 {
        self.omissions
            .iter()
            .map(|o| o.error.exit_code())
            .min()
            .unwrap_or(0)
    }
}

/// Walks Idle → PingPending → (TracePending) → SpeedPending → Complete, one probe at a time.
pub struct DiagnosticRun<'a> {
    runner: &'a dyn ProbeRunner,
    options: &'a RunOptions,
    state: RunState,
    ping: Option<PingMeasurement>,
    trace: Option<TraceMeasurement>,
    speed: Option<SpeedMeasurement>,
    omissions: Vec<Omission>,
}

impl<'a> DiagnosticRun<'a> {
    pub fn new(runner: &'a dyn ProbeRunner, options: &'a RunOptions) -> Self {
        Self {
            runner,
            options,
            state: RunState::Idle,
            ping: None,
            trace: None,
            speed: None,
            omissions: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn execute(mut self) -> RunOutcome {
        while self.state != RunState::Complete {
            let next = self.step();
            debug!("{:?} -> {:?}", self.state, next);
            self.state = next;
        }

        let timestamp = current_timestamp();
        let policy = &self.options.policy;
        let record = match (self.ping, self.trace) {
            (Some(ping), Some(trace)) => {
                SampleRecord::escalated(timestamp, ping.clone(), trace, self.speed.clone(), policy)
                    .unwrap_or_else(|| SampleRecord::new(timestamp, Some(ping), self.speed))
            }
            (ping, _) => SampleRecord::new(timestamp, ping, self.speed),
        };
        RunOutcome {
            record,
            omissions: self.omissions,
        }
    }

    fn step(&mut self) -> RunState {
        match self.state {
            RunState::Idle if !self.options.skip_ping => RunState::PingPending,
            RunState::Idle => self.after_ping(),
            RunState::PingPending => {
                if !self.options.ping.flood {
                    warn!("not running as root, unable to flood ping");
                }
                info!("running ping test against {}", self.options.target);
                match measure_ping(self.runner, &self.options.ping, &self.options.target) {
                    Ok(ping) => {
                        info!("ping result: {ping}");
                        let escalate = self.options.policy.should_trace(&ping);
                        self.ping = Some(ping);
                        if escalate {
                            return RunState::TracePending;
                        }
                    }
                    Err(e) => self.omit(Measurement::Ping, e),
                }
                self.after_ping()
            }
            RunState::TracePending => {
                info!(
                    "packet loss above {}%, tracing {}",
                    self.options.policy.max_packet_loss, self.options.target
                );
                match measure_trace(self.runner, &self.options.ping, &self.options.target) {
                    Ok(traced) => {
                        for failure in traced.failures {
                            self.omit(Measurement::HopPing, failure.error);
                        }
                        self.trace = Some(traced.measurement);
                    }
                    Err(e) => self.omit(Measurement::Trace, e),
                }
                self.after_ping()
            }
            RunState::SpeedPending => {
                if self.runner.is_available(SPEED_PROGRAM) {
                    info!("running speed test");
                    match measure_speed(self.runner) {
                        Ok(speed) => self.speed = Some(speed),
                        Err(e) => self.omit(Measurement::Speed, e),
                    }
                } else {
                    info!("{SPEED_PROGRAM} is not installed, skipping speed test");
                }
                RunState::Complete
            }
            RunState::Complete => RunState::Complete,
        }
    }

    fn after_ping(&self) -> RunState {
        if self.options.skip_speed {
            RunState::Complete
        } else {
            RunState::SpeedPending
        }
    }

    fn omit(&mut self, measurement: Measurement, error: MeasurementError) {
        match &error {
            MeasurementError::Probe(e) => error!("{measurement:?} test omitted: {e}"),
            MeasurementError::Parse(e) => warn!("{measurement:?} test omitted: {e}"),
        }
        self.omissions.push(Omission { measurement, error });
    }
}

pub fn run_diagnostics(runner: &dyn ProbeRunner, options: &RunOptions) -> RunOutcome {
    DiagnosticRun::new(runner, options).execute()
}
