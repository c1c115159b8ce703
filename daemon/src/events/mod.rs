//! Events published by the timer state machine
//!
//! Every transition is broadcast so IPC subscribers can follow along.
//! Ticks are not published; subscribers read the status snapshot instead.

use serde::{Deserialize, Serialize};

use crate::timer::Phase;

/// Events emitted by the state machine during transitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimerEvent {
    /// Countdown began or resumed
    Started {
        phase: Phase,
        remaining_secs: u64,
        generation: u64,
    },

    /// Countdown paused by the user
    Paused { phase: Phase, remaining_secs: u64 },

    /// A phase ran out and the next one was loaded
    PhaseCompleted {
        completed: Phase,
        next: Phase,
        message: String,
    },

    /// Break forced from the controls
    SwitchedToBreak,

    /// Timer reset to the top of a work session
    ResetToWork,

    /// Background music switched on or off
    MusicToggled { enabled: bool },

    /// Playback volume changed
    VolumeChanged { percent: u8 },
}

impl std::fmt::Display for TimerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerEvent::Started { phase, remaining_secs, .. } => {
                write!(f, "STARTED ({} {}s)", phase, remaining_secs)
            }
            TimerEvent::Paused { phase, remaining_secs } => {
                write!(f, "PAUSED ({} {}s)", phase, remaining_secs)
            }
            TimerEvent::PhaseCompleted { completed, next, .. } => {
                write!(f, "PHASE_COMPLETED ({} -> {})", completed, next)
            }
            TimerEvent::SwitchedToBreak => write!(f, "SWITCHED_TO_BREAK"),
            TimerEvent::ResetToWork => write!(f, "RESET_TO_WORK"),
            TimerEvent::MusicToggled { enabled } => write!(f, "MUSIC_TOGGLED ({})", enabled),
            TimerEvent::VolumeChanged { percent } => write!(f, "VOLUME_CHANGED ({}%)", percent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = TimerEvent::PhaseCompleted {
            completed: Phase::Work,
            next: Phase::Break,
            message: Phase::Work.completion_message().to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("phase_completed"));
        assert!(json.contains("\"next\":\"break\""));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"music_toggled","enabled":true}"#;
        let event: TimerEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event, TimerEvent::MusicToggled { enabled: true });
    }
}
