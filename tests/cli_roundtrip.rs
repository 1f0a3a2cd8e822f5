use std::cell::RefCell;
use std::collections::VecDeque;

use internet_troubleshooter::{
    EscalationPolicy, PingCommand, ProbeError, ProbeRunner, RecordStore, RunOptions, SampleRecord,
    render_human, render_series, run_diagnostics,
};
use tempfile::tempdir;

/// Answers each program from its own queue of canned outputs.
struct CannedProbes {
    ping: RefCell<VecDeque<String>>,
    trace: Option<String>,
    speed: Option<String>,
}

impl ProbeRunner for CannedProbes {
    fn run(&self, program: &str, _args: &[String]) -> Result<String, ProbeError> {
        let missing = || ProbeError::NotFound {
            program: program.to_string(),
        };
        match program {
            "ping" => self.ping.borrow_mut().pop_front().ok_or_else(missing),
            "traceroute" => self.trace.clone().ok_or_else(missing),
            "speedtest" => self.speed.clone().ok_or_else(missing),
            _ => Err(missing()),
        }
    }

    fn is_available(&self, program: &str) -> bool {
        program != "speedtest" || self.speed.is_some()
    }
}

fn loss(percent: f64) -> String {
    format!("--- 8.8.8.8 ping statistics ---\n10 packets transmitted, 9 received, {percent}% packet loss, time 9013ms\n")
}

fn speed(download: u64, upload: u64, latency: f64) -> String {
    format!(
        r#"{{"type":"result","ping":{{"latency":{latency}}},"download":{{"bandwidth":{download}}},"upload":{{"bandwidth":{upload}}}}}"#
    )
}

fn options() -> RunOptions {
    RunOptions {
        target: "8.8.8.8".to_string(),
        ping: PingCommand::for_privilege(false, Some(10)),
        policy: EscalationPolicy::default(),
        skip_ping: false,
        skip_speed: false,
    }
}

fn run_once(ping: Vec<String>, trace: Option<&str>, speed: Option<String>) -> SampleRecord {
    let probes = CannedProbes {
        ping: RefCell::new(ping.into()),
        trace: trace.map(str::to_string),
        speed,
    };
    run_diagnostics(&probes, &options()).record
}

#[test]
fn recorded_runs_summarize_and_chart() {
    let dir = tempdir().unwrap();
    let store = RecordStore::new(dir.path().join("internet.yaml"));

    let healthy = run_once(vec![loss(1.0)], None, Some(speed(7_317_857, 2_140_150, 19.0)));
    let lossy = run_once(
        vec![loss(5.0), loss(0.0), loss(40.0)],
        Some("traceroute to 8.8.8.8 (8.8.8.8), 30 hops max\n 1  gw (192.168.1.1)  0.4 ms\n 2  isp (100.64.0.1)  8.1 ms\n 3  dns.google (8.8.8.8)  9.0 ms"),
        Some(speed(6_250_000, 1_875_000, 21.0)),
    );
    let offline = run_once(Vec::new(), None, None);

    assert!(healthy.trace().is_none());
    let hops = &lossy.trace().unwrap().hop_pings;
    assert_eq!(hops.len(), 2);
    assert_eq!(hops[1].target, "100.64.0.1");
    assert_eq!(hops[1].packet_loss_percent, 40.0);
    assert!(offline.ping().is_none() && offline.speed().is_none());

    for record in [&healthy, &lossy, &offline] {
        store.append(record).unwrap();
    }
    let loaded = store.load_all().unwrap();
    assert_eq!(loaded, vec![healthy, lossy, offline]);

    let report = render_human(&loaded);
    assert!(report.contains("Packet Loss:\n  Mean: 3.00%"));
    assert!(report.contains("Download:\n  Mean: 54.27Mbps"));

    let chart = render_series(&loaded);
    assert_eq!(chart.traces.len(), 1);
    assert_eq!(chart.gaps.len(), 1);
}

#[test]
fn malformed_store_fails_whole_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("internet.yaml");
    let store = RecordStore::new(&path);
    store.append(&SampleRecord::new(1.0, None, None)).unwrap();
    std::fs::write(
        &path,
        format!(
            "{}---\n!!python/object:internet_troubleshooter.result.TestResult\npingResult: null\n...\n",
            std::fs::read_to_string(&path).unwrap()
        ),
    )
    .unwrap();

    assert!(store.load_all().is_err());
}
