//! IPC module for controlling the timer from other processes

mod protocol;
mod server;

pub use server::{Server, TimerHandles};
