//! Commands delivered to the timer controller loop

use serde::{Deserialize, Serialize};

/// Zero-argument user controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Start,
    Pause,
    ResetToWork,
    SwitchToBreak,
    ToggleMusic,
}

impl std::fmt::Display for Control {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Control::Start => write!(f, "start"),
            Control::Pause => write!(f, "pause"),
            Control::ResetToWork => write!(f, "reset"),
            Control::SwitchToBreak => write!(f, "break"),
            Control::ToggleMusic => write!(f, "music"),
        }
    }
}

/// Everything the controller loop can receive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A user control from the terminal or IPC
    Control(Control),
    /// Set playback volume as a percentage
    SetVolume(u32),
    /// Whole seconds elapsed, issued by the tick source of `generation`
    Tick { generation: u64, elapsed_secs: u64 },
    /// Stop the controller loop
    Quit,
}

impl From<Control> for Command {
    fn from(control: Control) -> Self {
        Command::Control(control)
    }
}
