//! Terminal command parsing
//!
//! One command per line:
//!
//! | input               | command          |
//! |---------------------|------------------|
//! | `s`, `start`        | start            |
//! | `p`, `pause`        | pause            |
//! | `r`, `reset`        | reset to work    |
//! | `b`, `break`        | switch to break  |
//! | `m`, `music`        | toggle music     |
//! | `v N`, `volume N`   | volume 0-100     |
//! | `q`, `quit`         | quit             |

use crate::timer::{Command, Control};

/// Reasons a line is not a command
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("unknown command `{0}`")]
    Unknown(String),

    #[error("volume must be an integer between 0 and 100, got `{0}`")]
    InvalidVolume(String),
}

/// Parse one line of terminal input
pub fn parse_line(line: &str) -> Result<Command, ParseError> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Err(ParseError::Empty);
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "s" | "start" => Control::Start.into(),
        "p" | "pause" => Control::Pause.into(),
        "r" | "reset" => Control::ResetToWork.into(),
        "b" | "break" => Control::SwitchToBreak.into(),
        "m" | "music" => Control::ToggleMusic.into(),
        "v" | "volume" => {
            let arg = words.next().unwrap_or_default();
            match arg.parse::<u32>() {
                Ok(percent) if percent <= 100 => Command::SetVolume(percent),
                _ => return Err(ParseError::InvalidVolume(arg.to_string())),
            }
        }
        "q" | "quit" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };

    Ok(command)
}
