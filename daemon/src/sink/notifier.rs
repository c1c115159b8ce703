//! Desktop notifications, chimes and background music

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use notify_rust::Notification;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::NotifierSink;
use crate::audio::{MusicPlayer, Volume};
use crate::timer::Phase;

const NOTIFICATION_SUMMARY: &str = "Pomodoro";

/// Errors from the desktop notification backend
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("desktop notifications are unavailable")]
    Unavailable,

    #[error("notification backend error: {0}")]
    Backend(#[from] notify_rust::error::Error),
}

/// Sound played when a phase runs out
#[derive(Debug, Clone, PartialEq)]
pub enum Chime {
    /// Terminal bell
    Bell,
    /// Sound file played once through the music player
    File(PathBuf),
}

/// Terminal output shared with notification delivery threads
type AlertOutput = Arc<Mutex<Box<dyn Write + Send>>>;

/// Notifier sink for a desktop session
///
/// Completion messages go to the desktop notification daemon when one is
/// reachable, otherwise to an alert banner on stderr. Delivery runs on the
/// blocking pool so a slow D-Bus call never stalls the controller.
pub struct DesktopNotifier {
    player: MusicPlayer,
    chime: Chime,
    volume: Volume,
    desktop: bool,
    alert_out: AlertOutput,
}

impl DesktopNotifier {
    /// `desktop` enables notification delivery; it is still probed here
    pub fn new(player: MusicPlayer, chime: Chime, desktop: bool) -> Self {
        let desktop = desktop && probe_notification_server();
        info!(desktop, ?chime, "notifier ready");

        Self {
            player,
            chime,
            volume: Volume::default(),
            desktop,
            alert_out: Arc::new(Mutex::new(Box::new(io::stderr()))),
        }
    }

    #[cfg(test)]
    fn with_alert_output(mut self, out: impl Write + Send + 'static) -> Self {
        self.alert_out = Arc::new(Mutex::new(Box::new(out)));
        self
    }

    fn play_chime(&mut self) {
        match &self.chime {
            Chime::Bell => {
                if let Err(e) = write_to(&self.alert_out, b"\x07") {
                    debug!(?e, "failed to ring bell");
                }
            }
            Chime::File(path) => {
                if let Err(e) = self.player.play_once(path, self.volume) {
                    warn!(%e, "chime playback failed");
                }
            }
        }
    }
}

fn show_notification(desktop: bool, message: &str) -> Result<(), NotifyError> {
    if !desktop {
        return Err(NotifyError::Unavailable);
    }

    Notification::new()
        .summary(NOTIFICATION_SUMMARY)
        .body(message)
        .show()?;
    Ok(())
}

/// Show `message` on the desktop, falling back to an alert banner
fn deliver(completed: Phase, desktop: bool, message: &str, alert_out: &AlertOutput) {
    match show_notification(desktop, message) {
        Ok(()) => debug!(%completed, "notification shown"),
        Err(NotifyError::Unavailable) => alert(alert_out, message),
        Err(e) => {
            warn!(%e, "notification failed, falling back to alert");
            alert(alert_out, message);
        }
    }
}

fn alert(alert_out: &AlertOutput, message: &str) {
    let banner = format!("\n*** {} ***\n", message);
    if let Err(e) = write_to(alert_out, banner.as_bytes()) {
        warn!(?e, "failed to write alert");
    }
}

fn write_to(out: &AlertOutput, bytes: &[u8]) -> io::Result<()> {
    let mut out = out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    out.write_all(bytes)?;
    out.flush()
}

impl NotifierSink for DesktopNotifier {
    fn phase_completed(&mut self, completed: Phase, message: &str) {
        self.play_chime();

        let desktop = self.desktop;
        let message = message.to_string();
        let alert_out = Arc::clone(&self.alert_out);
        let job = move || deliver(completed, desktop, &message, &alert_out);

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(job);
            }
            Err(_) => job(),
        }
    }

    fn play_music(&mut self, phase: Phase) -> bool {
        match self.player.play(phase) {
            Ok(()) => true,
            Err(e) => {
                warn!(%e, %phase, "music playback failed");
                false
            }
        }
    }

    fn stop_music(&mut self) {
        self.player.stop();
    }

    fn set_volume(&mut self, volume: Volume) -> bool {
        self.volume = volume;
        if let Err(e) = self.player.set_volume(volume) {
            warn!(%e, "failed to restart track at new volume");
            return false;
        }
        self.player.playing().is_some()
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn probe_notification_server() -> bool {
    match notify_rust::get_server_information() {
        Ok(server) => {
            debug!(name = %server.name, vendor = %server.vendor, "notification server found");
            true
        }
        Err(e) => {
            warn!(%e, "no notification server, completion alerts will use the terminal");
            false
        }
    }
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn probe_notification_server() -> bool {
    true
}
