use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, error, info};

use internet_troubleshooter::error::EXIT_LOAD_FAILURE;
use internet_troubleshooter::ping::is_root;
use internet_troubleshooter::{
    AppConfig, CommandRunner, EscalationPolicy, LoadError, PingCommand, RecordStore, RunOptions,
    html, render_human, render_series, run_diagnostics, viewer,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Test internet connection.")]
struct Cli {
    /// Print diagnostic messages to stderr
    #[arg(long, global = true, default_value_t = false)]
    debug: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one diagnostic cycle
    Run(RunArgs),
    /// Summarize or chart previously recorded runs
    Display(DisplayArgs),
    /// Save defaults for later runs to the config file
    Config(ConfigArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Address to ping and, on high packet loss, trace
    #[arg(long = "ping_ip", alias = "ping-ip")]
    ping_ip: Option<String>,
    /// Pings per probe (default 400 as root, 10 otherwise)
    #[arg(long = "ping_count", alias = "ping-count")]
    ping_count: Option<u32>,
    /// Packet loss percentage above which the path is traced
    #[arg(long = "max_packet_loss", alias = "max-packet-loss")]
    max_packet_loss: Option<f64>,
    #[arg(long = "skip_speedtest", alias = "skip-speedtest", default_value_t = false)]
    skip_speedtest: bool,
    #[arg(long = "skip_pingtest", alias = "skip-pingtest", default_value_t = false)]
    skip_pingtest: bool,
    /// Append the result to this file
    #[arg(long = "yaml_file", alias = "yaml-file")]
    yaml_file: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = RunFormat::Human)]
    format: RunFormat,
}

#[derive(clap::Args, Debug)]
struct DisplayArgs {
    /// File of recorded runs (defaults to the configured records file)
    #[arg(long = "yaml_file", alias = "yaml-file")]
    yaml_file: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = DisplayFormat::Human)]
    format: DisplayFormat,
    /// Write html output here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct ConfigArgs {
    #[arg(long = "ping_ip", alias = "ping-ip")]
    ping_ip: Option<String>,
    #[arg(long = "ping_count", alias = "ping-count")]
    ping_count: Option<u32>,
    #[arg(long = "max_packet_loss", alias = "max-packet-loss")]
    max_packet_loss: Option<f64>,
    /// Seconds before a probe is killed
    #[arg(long = "probe_timeout", alias = "probe-timeout")]
    probe_timeout: Option<u64>,
    #[arg(long = "yaml_file", alias = "yaml-file")]
    yaml_file: Option<PathBuf>,
}

impl ConfigArgs {
    fn apply(self, mut config: AppConfig) -> AppConfig {
        if let Some(target) = self.ping_ip {
            config.target = target;
        }
        if let Some(count) = self.ping_count {
            config.ping_count = Some(count);
        }
        if let Some(max) = self.max_packet_loss {
            config.max_packet_loss = max;
        }
        if let Some(secs) = self.probe_timeout {
            config.probe_timeout_secs = secs;
        }
        if let Some(path) = self.yaml_file {
            config.records_file = Some(path);
        }
        config
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum RunFormat {
    Human,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DisplayFormat {
    Human,
    Html,
    Gui,
}

fn init_logging(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn run(args: RunArgs, config: AppConfig) -> anyhow::Result<u8> {
    let options = RunOptions {
        target: args.ping_ip.unwrap_or(config.target),
        ping: PingCommand::for_privilege(is_root(), args.ping_count.or(config.ping_count)),
        policy: EscalationPolicy::new(args.max_packet_loss.unwrap_or(config.max_packet_loss)),
        skip_ping: args.skip_pingtest,
        skip_speed: args.skip_speedtest,
    };
    debug!("run options: {options:?}");

    let runner = CommandRunner::new(Duration::from_secs(config.probe_timeout_secs))
        .context("creating probe runtime")?;
    let outcome = run_diagnostics(&runner, &options);

    match args.format {
        RunFormat::Human => {
            let text = outcome.record.human_readable();
            if !text.is_empty() {
                println!("{text}");
            }
        }
        RunFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcome.record)?);
        }
    }

    if let Some(path) = args.yaml_file.or(config.records_file) {
        info!("logging results to {}", path.display());
        RecordStore::new(&path)
            .append(&outcome.record)
            .with_context(|| format!("recording results to {}", path.display()))?;
    }

    Ok(outcome.exit_code() as u8)
}

fn display(args: DisplayArgs, config: AppConfig) -> anyhow::Result<u8> {
    let Some(path) = args.yaml_file.or(config.records_file) else {
        bail!("no --yaml_file given and no records_file configured");
    };
    let records = RecordStore::new(&path).load_all()?;
    debug!("displaying {} records", records.len());

    match args.format {
        DisplayFormat::Human => println!("{}", render_human(&records)),
        DisplayFormat::Html => {
            let chart = render_series(&records);
            match args.output {
                Some(output) => {
                    let file = File::create(&output)
                        .with_context(|| format!("creating {}", output.display()))?;
                    let mut writer = BufWriter::new(file);
                    html::write_html(&chart, &mut writer)?;
                    writer.flush()?;
                }
                None => {
                    let stdout = io::stdout();
                    html::write_html(&chart, &mut stdout.lock())?;
                }
            }
        }
        DisplayFormat::Gui => {
            viewer::show(render_series(&records))
                .map_err(|e| anyhow!("chart window failed: {e}"))?;
        }
    }
    Ok(0)
}

fn configure(args: ConfigArgs, config: AppConfig) -> anyhow::Result<u8> {
    let config = args.apply(config);
    let path = config.save().context("saving config")?;
    info!("wrote {}", path.display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(0)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);
    debug!("parsed args: {cli:?}");

    let config = AppConfig::load();
    let result = match cli.command {
        Command::Run(args) => run(args, config),
        Command::Display(args) => display(args, config),
        Command::Config(args) => configure(args, config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e:#}");
            if e.downcast_ref::<LoadError>().is_some() {
                ExitCode::from(EXIT_LOAD_FAILURE as u8)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
