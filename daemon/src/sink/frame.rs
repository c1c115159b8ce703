//! Derived display state handed to the presentation sink

use serde::{Deserialize, Serialize};

use crate::timer::{Phase, TimerState, WARNING_THRESHOLD_SECS};

/// Visual theme of the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Focus,
    Rest,
}

impl From<Phase> for Theme {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Work => Theme::Focus,
            Phase::Break => Theme::Rest,
        }
    }
}

/// Which of the four controls are enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buttons {
    pub start: bool,
    pub pause: bool,
    pub switch_to_break: bool,
    pub reset_to_work: bool,
}

impl Buttons {
    /// Eligibility is a pure function of phase and running flag
    pub fn for_state(phase: Phase, running: bool) -> Self {
        Self {
            start: !running,
            pause: running,
            switch_to_break: phase == Phase::Work && !running,
            reset_to_work: phase == Phase::Break && !running,
        }
    }
}

/// One display snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub phase: Phase,
    pub remaining_secs: u64,
    pub running: bool,
    pub minutes: u64,
    pub seconds: u64,
    /// `MM:SS`, both zero-padded
    pub clock: String,
    pub label: String,
    /// Fraction of the phase already elapsed, `0.0..=1.0`
    pub progress: f64,
    pub warning: bool,
    pub buttons: Buttons,
    pub theme: Theme,
    pub music: bool,
}

impl Frame {
    pub fn derive(state: &TimerState, music: bool) -> Self {
        let minutes = state.remaining_secs / 60;
        let seconds = state.remaining_secs % 60;
        let duration = state.phase.duration_secs();
        let progress = if duration == 0 {
            1.0
        } else {
            1.0 - state.remaining_secs as f64 / duration as f64
        };

        Self {
            phase: state.phase,
            remaining_secs: state.remaining_secs,
            running: state.running,
            minutes,
            seconds,
            clock: format!("{:02}:{:02}", minutes, seconds),
            label: state.phase.label().to_string(),
            progress,
            warning: state.remaining_secs <= WARNING_THRESHOLD_SECS,
            buttons: Buttons::for_state(state.phase, state.running),
            theme: state.phase.into(),
            music,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(phase: Phase, remaining_secs: u64, running: bool) -> TimerState {
        TimerState {
            phase,
            remaining_secs,
            running,
        }
    }

    #[test]
    fn test_clock_is_zero_padded() {
        let frame = Frame::derive(&state(Phase::Work, 65, true), false);
        assert_eq!(frame.clock, "01:05");
        assert_eq!(frame.minutes, 1);
        assert_eq!(frame.seconds, 5);
    }

    #[test]
    fn test_fresh_phase_has_no_progress() {
        let frame = Frame::derive(&TimerState::idle(Phase::Break), false);
        assert_eq!(frame.progress, 0.0);
        assert_eq!(frame.clock, "05:00");
        assert_eq!(frame.label, "Break Time");
        assert_eq!(frame.theme, Theme::Rest);
    }

    #[test]
    fn test_progress_is_elapsed_fraction() {
        let frame = Frame::derive(&state(Phase::Break, 75, true), false);
        assert!((frame.progress - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_warning_threshold() {
        assert!(!Frame::derive(&state(Phase::Work, 61, true), false).warning);
        assert!(Frame::derive(&state(Phase::Work, 60, true), false).warning);
        assert!(Frame::derive(&state(Phase::Work, 0, false), false).warning);
    }

    #[test]
    fn test_buttons_idle_work() {
        let buttons = Buttons::for_state(Phase::Work, false);
        assert!(buttons.start);
        assert!(!buttons.pause);
        assert!(buttons.switch_to_break);
        assert!(!buttons.reset_to_work);
    }

    #[test]
    fn test_buttons_running_disables_phase_switches() {
        for phase in [Phase::Work, Phase::Break] {
            let buttons = Buttons::for_state(phase, true);
            assert!(!buttons.start);
            assert!(buttons.pause);
            assert!(!buttons.switch_to_break);
            assert!(!buttons.reset_to_work);
        }
    }

    #[test]
    fn test_buttons_idle_break() {
        let buttons = Buttons::for_state(Phase::Break, false);
        assert!(buttons.start);
        assert!(!buttons.switch_to_break);
        assert!(buttons.reset_to_work);
    }
}
