use std::io;
use std::sync::mpsc::Sender;
use std::thread;

use color_eyre::eyre::{self, WrapErr};
use tracing::{info, warn};

use crate::poller::PollCommand;

/// Forwards the first SIGINT (or SIGTERM on Unix) to the poller as `Terminate`.
pub fn spawn_interrupt_listener(command_tx: Sender<PollCommand>) -> eyre::Result<thread::JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("build signal runtime")?;

    thread::Builder::new()
        .name("signal".into())
        .spawn(move || match runtime.block_on(wait_for_interrupt()) {
            Ok(signal) => {
                info!(signal, "Script interrupted by user");
                command_tx.send(PollCommand::Terminate).ok();
            }
            Err(err) => warn!("cannot listen for interrupt signals: {err}"),
        })
        .wrap_err("spawn signal thread")
}

#[cfg(unix)]
async fn wait_for_interrupt() -> io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_interrupt() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "Ctrl+C")
}
