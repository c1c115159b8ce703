//! Sinks the timer state machine reports to
//!
//! - Presentation: receives a `Frame` after every state change
//! - Notifier: phase completion alerts and background music
//!
//! Sink implementations own their failures. Nothing they do can change
//! timer state; the only feedback is whether music is actually playing.

mod frame;
mod notifier;
mod terminal;

pub use frame::{Frame, Theme};
pub use notifier::{Chime, DesktopNotifier};
pub use terminal::TerminalPresenter;

use crate::audio::Volume;
use crate::timer::Phase;

/// Consumer of display frames
pub trait PresentationSink: Send {
    fn render(&mut self, frame: &Frame);
}

/// Consumer of phase transitions and music control
pub trait NotifierSink: Send {
    /// `completed` just ran out; surface `message` to the user
    fn phase_completed(&mut self, completed: Phase, message: &str);

    /// Play the looping track for `phase`. Returns whether playback began.
    fn play_music(&mut self, phase: Phase) -> bool;

    /// Stop any background track
    fn stop_music(&mut self);

    /// Apply `volume` to both tracks. Returns whether a track is still playing.
    fn set_volume(&mut self, volume: Volume) -> bool;
}
