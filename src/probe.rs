use std::env;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use log::debug;
use tokio::process::Command;
use tokio::runtime::{Builder, Runtime};

use crate::error::ProbeError;

pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 120;

/// Runs external diagnostic commands and hands back what they printed.
pub trait ProbeRunner {
    /// Runs `program` to completion and returns its stdout.
    fn run(&self, program: &str, args: &[String]) -> Result<String, ProbeError>;

    fn is_available(&self, program: &str) -> bool;
}

/// Runs probes as child processes, one at a time, each bounded by a timeout.
pub struct CommandRunner {
    runtime: Runtime,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(timeout: Duration) -> std::io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self { runtime, timeout })
    }

    async fn execute(&self, program: &str, args: &[String]) -> Result<String, ProbeError> {
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null()).kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProbeError::NotFound {
                    program: program.to_string(),
                });
            }
            Ok(Err(source)) => {
                return Err(ProbeError::Io {
                    program: program.to_string(),
                    source,
                });
            }
            Err(_) => {
                return Err(ProbeError::Timeout {
                    program: program.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() {
            return Err(ProbeError::Failed {
                program: program.to_string(),
                code: output.status.code(),
                stdout,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(stdout)
    }
}

impl ProbeRunner for CommandRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<String, ProbeError> {
        debug!("running {program} {}", args.join(" "));
        self.runtime.block_on(self.execute(program, args))
    }

    fn is_available(&self, program: &str) -> bool {
        find_on_path(program).is_some()
    }
}

fn find_on_path(program: &str) -> Option<std::path::PathBuf> {
    let program = Path::new(program);
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
