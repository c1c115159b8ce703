//! Audio playback: background tracks, chimes and volume

mod player;
mod volume;

pub use player::MusicPlayer;
pub use volume::Volume;
