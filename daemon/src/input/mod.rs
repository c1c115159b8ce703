//! Terminal input module
//!
//! Turns lines typed into the daemon's terminal into timer commands.

mod listener;
mod parse;

pub use listener::InputListener;
