//! Phases and their fixed durations

use serde::{Deserialize, Serialize};

/// Length of a work session in seconds
pub const WORK_DURATION_SECS: u64 = 25 * 60;

/// Length of a break in seconds
pub const BREAK_DURATION_SECS: u64 = 5 * 60;

/// Remaining time at or below which the display flags urgency
pub const WARNING_THRESHOLD_SECS: u64 = 60;

/// The two countdown modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Focused work interval
    Work,
    /// Rest interval
    Break,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Work
    }
}

impl Phase {
    /// Full length of this phase in seconds
    pub fn duration_secs(self) -> u64 {
        match self {
            Phase::Work => WORK_DURATION_SECS,
            Phase::Break => BREAK_DURATION_SECS,
        }
    }

    /// The phase that follows this one
    pub fn next(self) -> Self {
        match self {
            Phase::Work => Phase::Break,
            Phase::Break => Phase::Work,
        }
    }

    /// Human readable label shown next to the clock
    pub fn label(self) -> &'static str {
        match self {
            Phase::Work => "Work Time",
            Phase::Break => "Break Time",
        }
    }

    /// Message surfaced when this phase runs out
    pub fn completion_message(self) -> &'static str {
        match self {
            Phase::Work => "Work session completed! Time for a break!",
            Phase::Break => "Break time is over! Ready to work?",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Work => write!(f, "Work"),
            Phase::Break => write!(f, "Break"),
        }
    }
}
