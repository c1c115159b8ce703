//! Pomodoro timer core
//!
//! Two phases, Work and Break, each counted down by a cancelable tick
//! source. The machine owns all timer state; terminal input, IPC clients and
//! the tick source reach it only through `Command`s on one channel.

mod clock;
mod command;
mod machine;
mod phase;
mod state;
mod tick;

pub use command::{Command, Control};
pub use machine::{TimerMachine, TimerStatus};
pub use phase::{Phase, WARNING_THRESHOLD_SECS};
pub use state::{CompletionPolicy, TimerState};
pub use tick::{IntervalTickSource, TickSource, TICK_PERIOD};
