mod backend;
mod config;
mod constants;
mod decode;
mod descriptor;
mod error;
mod interface;
mod logging;
mod poller;
mod reader;
mod record;
mod signal;

#[cfg(debug_assertions)]
mod sim;

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use chrono::{Local, TimeDelta};
use clap::Parser;
use color_eyre::eyre;
use tracing::{debug, error, info, warn};

use config::DeviceConfig;
use constants::{DEFAULT_LOG_RETENTION_DAYS, MAX_RETRY_BACKOFF_MS};
use interface::InterfaceMode;
use logging::PruneSummary;
use poller::{ConnectPolicy, PollEvent, PollerConfig, TransportConfig, spawn_poller};
use record::RecordLogger;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Modbus TCP register poller")]
struct Args {
    /// Device configuration file (YAML)
    config: PathBuf,

    /// Device interface
    #[arg(short = 'I', long, value_enum, default_value_t = InterfaceMode::Tcp)]
    interface: InterfaceMode,

    /// Poll interval in seconds, overrides device.interval
    #[arg(short = 'i', long)]
    interval: Option<u64>,

    /// Log file (default: derived from the config file name)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level filter; RUST_LOG takes precedence
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Days of log history kept at startup, 0 keeps everything
    #[arg(long, default_value_t = DEFAULT_LOG_RETENTION_DAYS)]
    log_retention_days: u32,
}

#[derive(Debug, Clone)]
struct RuntimeArgs {
    poller: PollerConfig,
    log_path: PathBuf,
    retention: Option<TimeDelta>,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    let config = DeviceConfig::load(&args.config)?;
    let runtime = resolve_runtime_args(&args, &config)?;

    let pruned = runtime
        .retention
        .map(|retention| logging::prune_log_file(&runtime.log_path, retention, Local::now()));
    logging::init_logging(&runtime.log_path, &args.log_level)?;
    report_pruning(&runtime.log_path, pruned);

    let registers = config.descriptors();
    for err in &registers.errors {
        error!(register = err.register(), "{err}");
    }
    for descriptor in &registers.descriptors {
        let surplus = descriptor.surplus_words();
        if surplus > 0 {
            warn!(
                register = %descriptor.name,
                quantity = descriptor.quantity,
                data_type = %descriptor.data_type,
                "{surplus} register(s) read but not decoded"
            );
        }
    }
    if registers.descriptors.is_empty() {
        return Err(eyre::eyre!("no valid registers configured in {}", args.config.display()));
    }
    info!(
        device = %config.device.name,
        registers = registers.descriptors.len(),
        interval_s = runtime.poller.interval.as_secs(),
        "starting poller"
    );

    let (command_tx, command_rx) = mpsc::channel();
    let (event_tx, event_rx) = mpsc::channel();

    signal::spawn_interrupt_listener(command_tx.clone())?;
    let poller_handle = spawn_poller(runtime.poller, registers.descriptors, command_rx, event_tx);

    let records = RecordLogger::new(config.owner.clone(), config.device.name.clone());
    let mut exit_error: Option<eyre::Report> = None;

    for event in &event_rx {
        match event {
            PollEvent::Reading(value) => records.log(&value),
            PollEvent::Failure(err) => error!(register = err.register(), "{err}"),
            PollEvent::Connection(connected) => debug!(connected, "connection state changed"),
            PollEvent::Error(err) => exit_error = Some(err.wrap_err("modbus poller failed")),
        }
    }

    poller_handle.join().ok();
    drop(command_tx);

    if let Some(err) = exit_error {
        error!("{err:#}");
        return Err(err);
    }

    info!("poller stopped");
    Ok(())
}

fn resolve_runtime_args(args: &Args, config: &DeviceConfig) -> eyre::Result<RuntimeArgs> {
    let interface = {
        #[cfg(debug_assertions)]
        {
            resolve_interface_mode(args)
        }
        #[cfg(not(debug_assertions))]
        {
            resolve_interface_mode(args)?
        }
    };

    let host = config.modbus.host.clone();
    if interface.requires_host() && host.is_none() {
        return Err(eyre::eyre!("modbus.host required unless using simulation interface"));
    }

    let interval_secs = args.interval.unwrap_or(config.device.interval);
    if interval_secs == 0 {
        return Err(eyre::eyre!("poll interval must be at least 1 second"));
    }

    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| logging::default_log_path(&args.config));
    let retention = (args.log_retention_days > 0)
        .then(|| TimeDelta::days(i64::from(args.log_retention_days)));

    let modbus = &config.modbus;
    Ok(RuntimeArgs {
        poller: PollerConfig {
            device: config.device.name.clone(),
            transport: TransportConfig {
                interface,
                host,
                port: modbus.port,
                unit_id: modbus.unit_id,
                timeout: Duration::from_millis(modbus.timeout_ms),
            },
            interval: Duration::from_secs(interval_secs),
            connect: ConnectPolicy {
                attempts: modbus.connect_attempts,
                backoff: Duration::from_millis(modbus.retry_backoff_ms),
                max_backoff: Duration::from_millis(MAX_RETRY_BACKOFF_MS),
            },
        },
        log_path,
        retention,
    })
}

#[cfg(debug_assertions)]
fn resolve_interface_mode(args: &Args) -> InterfaceMode {
    args.interface
}

#[cfg(not(debug_assertions))]
fn resolve_interface_mode(args: &Args) -> eyre::Result<InterfaceMode> {
    if args.interface == InterfaceMode::Simulation {
        return Err(eyre::eyre!(
            "simulation interface is only available in debug builds"
        ));
    }
    Ok(args.interface)
}

fn report_pruning(log_path: &Path, outcome: Option<eyre::Result<Option<PruneSummary>>>) {
    match outcome {
        Some(Ok(Some(summary))) => {
            info!(
                kept = summary.kept,
                removed = summary.removed,
                "Old log entries cleaned from {}",
                log_path.display()
            );
            if summary.unparsable > 0 {
                warn!(
                    lines = summary.unparsable,
                    "dropped log lines without a timestamp"
                );
            }
        }
        Some(Ok(None)) => debug!("no log file at {} yet", log_path.display()),
        Some(Err(err)) => error!("Error during log cleanup: {err:#}"),
        None => {}
    }
}
