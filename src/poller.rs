use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use color_eyre::eyre;
use tracing::{debug, info, info_span, trace, warn};

use crate::backend::{Transport, build_transport};
use crate::descriptor::RegisterDescriptor;
use crate::error::RegisterError;
use crate::interface::InterfaceMode;
use crate::reader::read_register;
use crate::record::DecodedValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollCommand {
    Terminate,
}

#[derive(Debug)]
pub enum PollEvent {
    Reading(DecodedValue),
    Failure(RegisterError),
    Connection(bool),
    Error(eyre::Report),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Disconnected,
    Connecting,
    Polling,
    Reading,
    Decoding,
    Sleeping,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub interface: InterfaceMode,
    pub host: Option<String>,
    pub port: u16,
    pub unit_id: u8,
    pub timeout: Duration,
}

/// How often and how patiently to retry opening the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectPolicy {
    pub attempts: u32,
    pub backoff: Duration,
    pub max_backoff: Duration,
}

impl ConnectPolicy {
    /// Wait after the `attempt`-th failure (1-based): doubles each time, capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    pub device: String,
    pub transport: TransportConfig,
    pub interval: Duration,
    pub connect: ConnectPolicy,
}

/// Outcome of one read-all-then-decode-all pass.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub values: Vec<DecodedValue>,
    pub failures: Vec<RegisterError>,
    pub interrupted: bool,
}

pub fn spawn_poller(
    config: PollerConfig,
    descriptors: Vec<RegisterDescriptor>,
    command_rx: Receiver<PollCommand>,
    event_tx: Sender<PollEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let span = info_span!("device", name = %config.device);
        let _entered = span.enter();

        let result = build_transport(&config.transport).and_then(|mut transport| {
            run_poll_loop(transport.as_mut(), &descriptors, &config, &command_rx, &event_tx)
        });

        if let Err(err) = result {
            let _ = event_tx.send(PollEvent::Error(err));
        }
    })
}

/// Open connection; closed exactly once when dropped.
struct Session<'t> {
    transport: &'t mut dyn Transport,
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        match self.transport.close() {
            Ok(()) => info!("Modbus client closed"),
            Err(err) => warn!("error closing modbus client: {err:#}"),
        }
    }
}

pub(crate) fn run_poll_loop(
    transport: &mut dyn Transport,
    descriptors: &[RegisterDescriptor],
    config: &PollerConfig,
    command_rx: &Receiver<PollCommand>,
    event_tx: &Sender<PollEvent>,
) -> eyre::Result<()> {
    let mut state = PollState::Disconnected;

    enter(&mut state, PollState::Connecting);
    let session = match connect(transport, &config.connect, command_rx) {
        Ok(Some(session)) => session,
        Ok(None) => {
            enter(&mut state, PollState::Stopped);
            return Ok(());
        }
        Err(err) => {
            enter(&mut state, PollState::Disconnected);
            return Err(err);
        }
    };
    event_tx.send(PollEvent::Connection(true)).ok();

    let result = poll_until_stopped(session, descriptors, config, command_rx, event_tx, &mut state);
    event_tx.send(PollEvent::Connection(false)).ok();
    enter(&mut state, PollState::Stopped);
    result
}

#[allow(clippy::needless_pass_by_value)]
fn poll_until_stopped(
    mut session: Session<'_>,
    descriptors: &[RegisterDescriptor],
    config: &PollerConfig,
    command_rx: &Receiver<PollCommand>,
    event_tx: &Sender<PollEvent>,
    state: &mut PollState,
) -> eyre::Result<()> {
    let mut deadline = Instant::now();

    loop {
        enter(state, PollState::Polling);
        let started = Instant::now();
        enter(state, PollState::Reading);
        let report = poll_cycle(&mut *session.transport, descriptors, || {
            matches!(command_rx.try_recv(), Ok(PollCommand::Terminate))
        });
        if report.interrupted {
            info!("cycle abandoned on shutdown request");
            return Ok(());
        }

        enter(state, PollState::Decoding);
        debug!(
            decoded = report.values.len(),
            failed = report.failures.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "cycle complete"
        );
        for failure in report.failures {
            event_tx.send(PollEvent::Failure(failure)).ok();
        }
        for value in report.values {
            event_tx.send(PollEvent::Reading(value)).ok();
        }

        let now = Instant::now();
        deadline = next_deadline(deadline, config.interval, now);
        enter(state, PollState::Sleeping);
        match command_rx.recv_timeout(deadline.saturating_duration_since(now)) {
            Ok(PollCommand::Terminate) => return Ok(()),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(eyre::eyre!("command channel closed"));
            }
        }
    }
}

fn connect<'t>(
    transport: &'t mut dyn Transport,
    policy: &ConnectPolicy,
    command_rx: &Receiver<PollCommand>,
) -> eyre::Result<Option<Session<'t>>> {
    let mut attempt = 1;
    loop {
        match transport.open() {
            Ok(()) => {
                info!(attempt, "Modbus client connected");
                return Ok(Some(Session { transport }));
            }
            Err(err) if attempt >= policy.attempts => {
                return Err(err.wrap_err(format!(
                    "open modbus connection failed after {attempt} attempt(s)"
                )));
            }
            Err(err) => {
                let delay = policy.delay(attempt);
                warn!(
                    attempt,
                    retry_in_ms = delay.as_millis(),
                    "open modbus connection failed: {err:#}"
                );
                match command_rx.recv_timeout(delay) {
                    Ok(PollCommand::Terminate) => return Ok(None),
                    Err(RecvTimeoutError::Timeout) => attempt += 1,
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(eyre::eyre!("command channel closed"));
                    }
                }
            }
        }
    }
}

/// Reads every descriptor in order, then decodes the successful readings.
///
/// `stop_requested` is checked before each read; once it returns true the
/// rest of the cycle is dropped without decoding anything.
pub(crate) fn poll_cycle(
    transport: &mut dyn Transport,
    descriptors: &[RegisterDescriptor],
    mut stop_requested: impl FnMut() -> bool,
) -> CycleReport {
    let mut report = CycleReport::default();
    let mut readings = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        if stop_requested() {
            report.interrupted = true;
            return report;
        }
        match read_register(transport, descriptor) {
            Ok(reading) => {
                trace!(
                    register = %descriptor.name,
                    captured_at = %reading.captured_at,
                    latency_us = reading.latency.as_micros(),
                    "register read"
                );
                readings.push(reading);
            }
            Err(err) => report.failures.push(err),
        }
    }

    for reading in readings {
        match reading.decode() {
            Ok(value) => report.values.push(value),
            Err(err) => report.failures.push(err),
        }
    }
    report
}

/// Next cycle start on a fixed-rate grid; an overrun re-anchors at `now`.
fn next_deadline(previous: Instant, interval: Duration, now: Instant) -> Instant {
    let next = previous + interval;
    if next > now {
        return next;
    }
    debug!(
        overrun_ms = (now - next).as_millis(),
        "cycle overran its interval"
    );
    now
}

fn enter(state: &mut PollState, next: PollState) {
    if *state != next {
        trace!(from = ?*state, to = ?next, "poller state");
        *state = next;
    }
}
