//! pomodoro-daemon: terminal Pomodoro timer
//!
//! Counts down alternating work and break intervals and provides:
//! - A single-line status display on stdout
//! - Terminal commands on stdin (start, pause, reset, break, music, volume)
//! - Chime and desktop notification when a phase runs out
//! - Looping background music per phase through an external player
//! - A Unix socket for controlling the timer from other processes
//!
//! Timer state is never persisted; each run starts at a fresh work session.

mod audio;
mod config;
mod events;
mod input;
mod ipc;
mod lifecycle;
mod sink;
mod timer;

use anyhow::Result;
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::audio::MusicPlayer;
use crate::config::Config;
use crate::events::TimerEvent;
use crate::input::InputListener;
use crate::ipc::{Server, TimerHandles};
use crate::lifecycle::ShutdownSignal;
use crate::sink::{Chime, DesktopNotifier, TerminalPresenter};
use crate::timer::{Command, IntervalTickSource, TimerMachine, TICK_PERIOD};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, the status line owns stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "pomodoro-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(
        ?config.socket_path,
        policy = ?config.completion_policy,
        player = %config.player,
        "configuration loaded"
    );

    // Create shutdown signal handler
    let shutdown = ShutdownSignal::new();

    // Terminal input, IPC clients and the tick source -> timer controller
    let (command_tx, command_rx) = mpsc::channel::<Command>(64);
    // Timer controller -> IPC subscribers
    let (event_tx, _event_rx) = broadcast::channel::<TimerEvent>(64);

    // Build the sinks
    let player = MusicPlayer::new(
        config.player.clone(),
        config.focus_track.clone(),
        config.break_track.clone(),
    );
    let chime = config.chime.clone().map_or(Chime::Bell, Chime::File);
    let notifier = DesktopNotifier::new(player, chime, config.notifications);
    let presenter = TerminalPresenter::stdout();
    let ticks = IntervalTickSource::new(TICK_PERIOD, command_tx.clone());

    // Create the timer state machine
    let mut machine = TimerMachine::new(
        config.completion_policy,
        Box::new(ticks),
        Box::new(presenter),
        Box::new(notifier),
        event_tx.clone(),
    );
    machine.set_volume(u32::from(config.volume.percent()));

    // Start reading terminal commands (runs on dedicated thread)
    let input_listener = InputListener::new(command_tx.clone());
    match input_listener.start() {
        Ok(()) => {
            info!("input listener started");
        }
        Err(e) => {
            error!(?e, "failed to start input listener");
            warn!("continuing without terminal controls - use the IPC socket");
        }
    }

    // Create IPC server
    let server = Server::new(
        &config.socket_path,
        TimerHandles {
            status: machine.status(),
            commands: command_tx.clone(),
            events: event_tx.clone(),
        },
    )?;

    info!("daemon initialized, entering main loop");

    // Main event loop
    tokio::select! {
        // Run the timer controller (processes controls and ticks)
        _ = machine.run(command_rx) => {
            info!("timer controller exited");
        }

        // Run the IPC server (accepts client connections)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Wait for shutdown signal
        result = shutdown.wait() => {
            match result {
                Ok(()) => info!("shutdown signal received"),
                Err(e) => error!(?e, "failed to install signal handlers"),
            }
        }
    }

    // Cleanup
    info!("shutting down...");

    machine.shutdown();
    let last = machine.state();
    info!(phase = %last.phase, remaining_secs = last.remaining_secs, "timer state at exit");
    if input_listener.is_running() {
        input_listener.stop();
    }
    server.shutdown().await;

    info!("pomodoro-daemon stopped");

    Ok(())
}
