//! Background music through an external player process
//!
//! Each phase has its own looping track. Playback is delegated to a player
//! executable that accepts mpv-style flags; the child is killed whenever the
//! track changes or music is switched off.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::Volume;
use crate::timer::Phase;

/// Errors raised while starting playback
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("audio file not found: {0}")]
    MissingFile(PathBuf),

    #[error("failed to spawn player `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("player `{program}` exited immediately: {status}")]
    Exited { program: String, status: ExitStatus },
}

/// A looping background track
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub path: PathBuf,
    pub volume: Volume,
}

struct Playing {
    phase: Phase,
    child: Child,
}

/// Plays the focus or break track, one at a time
pub struct MusicPlayer {
    program: String,
    focus: Track,
    rest: Track,
    playing: Option<Playing>,
}

impl MusicPlayer {
    pub fn new(program: impl Into<String>, focus: PathBuf, rest: PathBuf) -> Self {
        let volume = Volume::default();
        Self {
            program: program.into(),
            focus: Track {
                path: focus,
                volume,
            },
            rest: Track { path: rest, volume },
            playing: None,
        }
    }

    /// Track used during `phase`
    pub fn track(&self, phase: Phase) -> &Track {
        match phase {
            Phase::Work => &self.focus,
            Phase::Break => &self.rest,
        }
    }

    /// Phase whose track is currently playing
    ///
    /// A player process that has exited since the last call is reaped here
    /// and no longer counts as playing.
    pub fn playing(&mut self) -> Option<Phase> {
        let current = self.playing.as_mut()?;
        match current.child.try_wait() {
            Ok(None) => Some(current.phase),
            Ok(Some(status)) => {
                warn!(phase = %current.phase, %status, "player exited");
                self.playing = None;
                None
            }
            Err(e) => {
                debug!(?e, "failed to poll player");
                Some(current.phase)
            }
        }
    }

    /// Switch playback to the track for `phase`
    pub fn play(&mut self, phase: Phase) -> Result<(), AudioError> {
        self.stop();

        let track = self.track(phase).clone();
        let mut child = self.spawn(&track.path, track.volume, true)?;
        if let Ok(Some(status)) = child.try_wait() {
            return Err(AudioError::Exited {
                program: self.program.clone(),
                status,
            });
        }
        info!(%phase, path = ?track.path, gain = track.volume.gain(), "music playing");

        self.playing = Some(Playing { phase, child });
        Ok(())
    }

    /// Kill the playing track, if any
    pub fn stop(&mut self) {
        if let Some(mut playing) = self.playing.take() {
            if let Err(e) = playing.child.start_kill() {
                debug!(?e, "player already exited");
            }
            info!(phase = %playing.phase, "music stopped");
        }
    }

    /// Apply `volume` to both tracks, restarting the one that is playing
    pub fn set_volume(&mut self, volume: Volume) -> Result<(), AudioError> {
        self.focus.volume = volume;
        self.rest.volume = volume;

        match self.playing() {
            Some(phase) => self.play(phase),
            None => Ok(()),
        }
    }

    /// Play `path` once without tracking the child
    pub fn play_once(&self, path: &Path, volume: Volume) -> Result<(), AudioError> {
        self.spawn(path, volume, false).map(drop)
    }

    fn spawn(&self, path: &Path, volume: Volume, looping: bool) -> Result<Child, AudioError> {
        if !path.is_file() {
            return Err(AudioError::MissingFile(path.to_owned()));
        }

        Command::new(&self.program)
            .args(player_args(path, volume, looping))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(looping)
            .spawn()
            .map_err(|source| AudioError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}

impl Drop for MusicPlayer {
    fn drop(&mut self) {
        if self.playing.is_some() {
            warn!("music player dropped while playing, stopping track");
            self.stop();
        }
    }
}

fn player_args(path: &Path, volume: Volume, looping: bool) -> Vec<String> {
    let mut args = vec![
        "--no-video".to_string(),
        "--really-quiet".to_string(),
        format!("--volume={}", volume.percent()),
    ];
    if looping {
        args.push("--loop-file=inf".to_string());
    }
    args.push(path.to_string_lossy().into_owned());
    args
}
