//! Timer state value

use serde::{Deserialize, Serialize};

use super::phase::Phase;

/// Completion behaviour once a phase runs out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Sit idle in the next phase until started again
    #[default]
    Stop,
    /// Immediately begin counting down the next phase
    AutoStart,
}

/// Phase, remaining time and running flag
///
/// `remaining_secs` always lies in `0..=phase.duration_secs()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub phase: Phase,
    pub remaining_secs: u64,
    pub running: bool,
}

impl TimerState {
    /// Idle at the top of a work session
    pub fn new() -> Self {
        Self::idle(Phase::Work)
    }

    /// Idle at the top of `phase`
    pub fn idle(phase: Phase) -> Self {
        Self {
            phase,
            remaining_secs: phase.duration_secs(),
            running: false,
        }
    }
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = TimerState::new();
        assert_eq!(state.phase, Phase::Work);
        assert_eq!(state.remaining_secs, 1500);
        assert!(!state.running);
    }
}
