//! Cancelable periodic tick source
//!
//! The state machine never sleeps itself. It asks a `TickSource` to start
//! delivering `Command::Tick` into the controller channel and cancels it when
//! the countdown stops. Every activation carries a generation number so ticks
//! that were already queued when the source was canceled can be recognised
//! and dropped.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::clock::ElapsedClock;
use super::command::Command;

/// How often the interval wakes up to measure elapsed time
pub const TICK_PERIOD: Duration = Duration::from_millis(250);

/// A periodic source of ticks that can be started and canceled
pub trait TickSource: Send {
    /// Begin ticking under `generation`, canceling any live activation first
    fn start(&mut self, generation: u64);

    /// Stop ticking. No tick of the canceled activation is sent afterwards.
    fn cancel(&mut self);

    /// Whether an activation is live
    fn is_active(&self) -> bool;
}

/// Tick source backed by a tokio interval task
pub struct IntervalTickSource {
    period: Duration,
    command_tx: mpsc::Sender<Command>,
    task: Option<JoinHandle<()>>,
}

impl IntervalTickSource {
    /// Create a tick source that feeds `command_tx` every `period`
    pub fn new(period: Duration, command_tx: mpsc::Sender<Command>) -> Self {
        Self {
            period,
            command_tx,
            task: None,
        }
    }
}

impl TickSource for IntervalTickSource {
    fn start(&mut self, generation: u64) {
        self.cancel();

        let command_tx = self.command_tx.clone();
        let period = self.period;
        let mut clock = ElapsedClock::new(Instant::now());

        debug!(generation, ?period, "tick source starting");

        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                let elapsed_secs = clock.advance(Instant::now());
                if elapsed_secs == 0 {
                    continue;
                }

                let tick = Command::Tick {
                    generation,
                    elapsed_secs,
                };
                if command_tx.send(tick).await.is_err() {
                    warn!(generation, "command channel closed, tick source exiting");
                    break;
                }
            }
        }));
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("tick source canceled");
        }
    }

    fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for IntervalTickSource {
    fn drop(&mut self) {
        self.cancel();
    }
}
