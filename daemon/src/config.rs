//! Configuration loading and management

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::audio::Volume;
use crate::timer::CompletionPolicy;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data and default tracks
    pub data_dir: PathBuf,

    /// What happens when a phase runs out
    pub completion_policy: CompletionPolicy,

    /// Background track during work
    pub focus_track: PathBuf,

    /// Background track during breaks
    pub break_track: PathBuf,

    /// Optional sound played at phase completion; terminal bell otherwise
    pub chime: Option<PathBuf>,

    /// Player executable, invoked with mpv-style flags
    pub player: String,

    /// Initial playback volume
    pub volume: Volume,

    /// Deliver completion messages as desktop notifications
    pub notifications: bool,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Self::from_lookup(&home, |key| std::env::var(key).ok())
    }

    fn from_lookup(home: &str, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("pomodoro");

        let socket_path = var("POMODORO_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));

        let completion_policy = match var("POMODORO_AUTO_START") {
            Some(value) if parse_flag(&value).context("invalid POMODORO_AUTO_START")? => {
                CompletionPolicy::AutoStart
            }
            _ => CompletionPolicy::Stop,
        };

        let volume = match var("POMODORO_VOLUME") {
            Some(value) => {
                let percent: u32 = value
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid POMODORO_VOLUME `{}`", value))?;
                Volume::from_percent(percent)
            }
            None => Volume::default(),
        };

        let notifications = match var("POMODORO_NOTIFICATIONS") {
            Some(value) => parse_flag(&value).context("invalid POMODORO_NOTIFICATIONS")?,
            None => true,
        };

        Ok(Self {
            focus_track: var("POMODORO_FOCUS_TRACK")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("focus.mp3")),
            break_track: var("POMODORO_BREAK_TRACK")
                .map(PathBuf::from)
                .unwrap_or_else(|| data_dir.join("break.mp3")),
            chime: var("POMODORO_CHIME").map(PathBuf::from),
            player: var("POMODORO_PLAYER").unwrap_or_else(|| "mpv".to_string()),
            socket_path,
            data_dir,
            completion_policy,
            volume,
            notifications,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected a boolean, got `{}`", other),
    }
}
