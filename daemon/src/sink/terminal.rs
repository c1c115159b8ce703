//! Single-line terminal rendering of timer frames

use std::io::{self, Stdout, Write};

use tracing::debug;

use super::{Frame, PresentationSink, Theme};

const BAR_WIDTH: usize = 20;

/// Rewrites one status line on every frame
pub struct TerminalPresenter<W: Write + Send = Stdout> {
    out: W,
    last_line: Option<String>,
}

impl TerminalPresenter<Stdout> {
    /// Presenter writing to the process stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_line: None,
        }
    }

    fn write_line(&mut self, line: &str, theme: Theme) -> io::Result<()> {
        let color = match theme {
            Theme::Focus => "\x1b[1;31m",
            Theme::Rest => "\x1b[1;32m",
        };
        write!(self.out, "\r{}{}\x1b[0m\x1b[K", color, line)?;
        self.out.flush()
    }
}

/// Plain text of a frame, without terminal control sequences
pub fn format_line(frame: &Frame) -> String {
    let filled = ((frame.progress * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    let bar: String = "#".repeat(filled) + &"-".repeat(BAR_WIDTH - filled);

    let status = if frame.running { "running" } else { "paused" };

    let mut keys = Vec::new();
    if frame.buttons.start {
        keys.push("[s]tart");
    }
    if frame.buttons.pause {
        keys.push("[p]ause");
    }
    if frame.buttons.switch_to_break {
        keys.push("[b]reak");
    }
    if frame.buttons.reset_to_work {
        keys.push("[r]eset");
    }
    keys.push(if frame.music { "[m]usic on" } else { "[m]usic off" });

    let mut line = format!(
        "[{}] {} [{}] {:>3}% {}",
        frame.label,
        frame.clock,
        bar,
        (frame.progress * 100.0).round() as u32,
        status,
    );
    if frame.warning {
        line.push_str(" !LOW!");
    }
    line.push_str("  ");
    line.push_str(&keys.join(" "));
    line
}

impl<W: Write + Send> Drop for TerminalPresenter<W> {
    fn drop(&mut self) {
        // Leave the cursor below the status line
        if self.last_line.is_some() {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
        }
    }
}

impl<W: Write + Send> PresentationSink for TerminalPresenter<W> {
    fn render(&mut self, frame: &Frame) {
        let line = format_line(frame);
        if self.last_line.as_deref() == Some(line.as_str()) {
            return;
        }

        if let Err(e) = self.write_line(&line, frame.theme) {
            debug!(?e, "failed to write status line");
            return;
        }
        self.last_line = Some(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{Phase, TimerState};

    #[test]
    fn test_format_idle_work() {
        let frame = Frame::derive(&TimerState::new(), false);
        let line = format_line(&frame);
        assert!(line.starts_with("[Work Time] 25:00 [--------------------]   0% paused"));
        assert!(line.contains("[s]tart"));
        assert!(line.contains("[b]reak"));
        assert!(!line.contains("[p]ause"));
        assert!(!line.contains("!LOW!"));
    }

    #[test]
    fn test_format_running_with_warning() {
        let state = TimerState {
            phase: Phase::Break,
            remaining_secs: 30,
            running: true,
        };
        let line = format_line(&Frame::derive(&state, true));
        assert!(line.contains("00:30"));
        assert!(line.contains("90%"));
        assert!(line.contains("!LOW!"));
        assert!(line.contains("[p]ause"));
        assert!(line.contains("[m]usic on"));
    }

    #[test]
    fn test_unchanged_frame_is_not_redrawn() {
        let mut presenter = TerminalPresenter::new(Vec::new());
        let frame = Frame::derive(&TimerState::new(), false);

        presenter.render(&frame);
        let after_first = presenter.out.len();
        presenter.render(&frame);
        assert_eq!(presenter.out.len(), after_first);

        let output = String::from_utf8(presenter.out.clone()).unwrap();
        assert!(output.starts_with('\r'));
        assert!(output.contains("25:00"));
    }
}
