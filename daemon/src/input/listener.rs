//! Terminal input listener
//!
//! Reads stdin line by line on a dedicated thread, since blocking reads do
//! not belong on the async runtime. Parsed commands are forwarded to the
//! timer controller channel.

use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::parse::{parse_line, ParseError};
use crate::timer::Command;

/// Forwards terminal commands to the timer controller
pub struct InputListener {
    command_tx: mpsc::Sender<Command>,
    running: Arc<AtomicBool>,
}

impl InputListener {
    /// Create a new input listener
    pub fn new(command_tx: mpsc::Sender<Command>) -> Self {
        Self {
            command_tx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start reading stdin on a dedicated thread
    pub fn start(&self) -> Result<(), InputError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(InputError::AlreadyRunning);
        }

        let command_tx = self.command_tx.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("input-listener".to_string())
            .spawn(move || {
                info!("input listener thread started");

                let stdin = io::stdin();
                if let Err(e) = forward_lines(stdin.lock(), &command_tx, &running) {
                    error!(?e, "input listener error");
                }

                running.store(false, Ordering::SeqCst);
                info!("input listener thread stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                InputError::ThreadSpawn(e.to_string())
            })?;

        Ok(())
    }

    /// Ask the listener to stop after the line it is waiting on
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Errors that can occur in the input listener
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("input listener is already running")]
    AlreadyRunning,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("failed to read terminal input: {0}")]
    Read(#[from] io::Error),
}

/// Parse lines from `reader` and send them until EOF, stop or quit
fn forward_lines(
    reader: impl BufRead,
    command_tx: &mpsc::Sender<Command>,
    running: &AtomicBool,
) -> Result<(), InputError> {
    for line in reader.lines() {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let line = line?;
        let command = match parse_line(&line) {
            Ok(command) => command,
            Err(ParseError::Empty) => continue,
            Err(e) => {
                warn!(%e, "ignoring input");
                continue;
            }
        };

        debug!(?command, "terminal command");
        let quit = command == Command::Quit;

        if command_tx.blocking_send(command).is_err() {
            warn!("failed to send command - channel closed?");
            break;
        }
        if quit {
            break;
        }
    }

    Ok(())
}
