//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::TimerEvent;
use crate::timer::{Control, TimerStatus};

/// Largest accepted message body
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Requests from a client to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request the current timer status
    GetStatus,

    /// Press one of the timer controls
    Control { control: Control },

    /// Set playback volume, 0-100
    SetVolume { percent: u32 },

    /// Ping to check connectivity
    Ping,

    /// Subscribe to timer event notifications
    Subscribe,
}

/// Responses from daemon to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current timer status
    Status(TimerStatus),

    /// Command accepted by the timer controller
    Ack,

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A timer event occurred
    TimerEvent { event: TimerEvent },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::Frame;
    use crate::timer::{Phase, TimerState};

    #[test]
    fn test_request_serialization() {
        let req = Request::Control {
            control: Control::SwitchToBreak,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"type":"control","control":"switch_to_break"}"#);
    }

    #[test]
    fn test_request_deserialization() {
        let req: Request = serde_json::from_str(r#"{"type":"set_volume","percent":50}"#).unwrap();
        assert_eq!(req, Request::SetVolume { percent: 50 });
    }

    #[test]
    fn test_status_response_serialization() {
        let status = TimerStatus {
            frame: Frame::derive(&TimerState::idle(Phase::Break), false),
            volume_percent: 50,
        };
        let json = serde_json::to_value(Response::Status(status)).unwrap();

        assert_eq!(json["type"], "status");
        assert_eq!(json["clock"], "05:00");
        assert_eq!(json["label"], "Break Time");
        assert_eq!(json["volume_percent"], 50);
        assert_eq!(json["buttons"]["reset_to_work"], true);
    }

    #[test]
    fn test_notification_serialization() {
        let note = Notification::TimerEvent {
            event: TimerEvent::ResetToWork,
        };
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(
            json,
            r#"{"type":"timer_event","event":{"type":"reset_to_work"}}"#
        );
    }
}
